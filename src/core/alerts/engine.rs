//! Alert rule evaluation pass

use super::dedup::AlertDeduplicator;
use super::rules::AlertRule;
use super::thresholds::AlertThresholds;
use crate::adapters::database::{AlertStore, ClinicStore};
use crate::domain::NewAlert;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Counters of one evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRunSummary {
    pub candidates: usize,
    pub created: usize,
    /// Candidates with a pending alert already in place
    pub suppressed: usize,
    /// Candidates skipped because the pending check failed
    pub dedup_failures: usize,
    /// Rules whose storage query failed
    pub rule_failures: usize,
    pub write_failures: usize,
}

impl AlertRunSummary {
    pub fn has_failures(&self) -> bool {
        self.dedup_failures + self.rule_failures + self.write_failures > 0
    }

    pub fn log_summary(&self) {
        tracing::info!(
            candidates = self.candidates,
            created = self.created,
            suppressed = self.suppressed,
            dedup_failures = self.dedup_failures,
            rule_failures = self.rule_failures,
            write_failures = self.write_failures,
            "Alert evaluation completed"
        );
    }
}

/// Runs every rule and writes the candidates that survive deduplication
pub struct AlertRuleEngine {
    clinic: Arc<dyn ClinicStore>,
    alerts: Arc<dyn AlertStore>,
    dedup: AlertDeduplicator,
    thresholds: AlertThresholds,
}

impl AlertRuleEngine {
    pub fn new(
        clinic: Arc<dyn ClinicStore>,
        alerts: Arc<dyn AlertStore>,
        thresholds: AlertThresholds,
    ) -> Self {
        Self {
            clinic,
            dedup: AlertDeduplicator::new(alerts.clone()),
            alerts,
            thresholds,
        }
    }

    pub async fn evaluate(&self) -> AlertRunSummary {
        self.evaluate_at(Utc::now().date_naive()).await
    }

    /// One pass over all rules for `today`
    ///
    /// Never fails as a whole: rule, dedup and write failures are logged and
    /// counted in the summary.
    pub async fn evaluate_at(&self, today: NaiveDate) -> AlertRunSummary {
        let mut summary = AlertRunSummary::default();

        for rule in AlertRule::ALL {
            let candidates = match rule
                .evaluate(self.clinic.as_ref(), &self.thresholds, today)
                .await
            {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::error!(rule = %rule, error = %e, "Alert rule query failed");
                    summary.rule_failures += 1;
                    continue;
                }
            };

            tracing::debug!(rule = %rule, candidates = candidates.len(), "Alert rule evaluated");
            for candidate in candidates {
                summary.candidates += 1;
                self.consider(rule, candidate, &mut summary).await;
            }
        }

        summary.log_summary();
        summary
    }

    async fn consider(&self, rule: AlertRule, candidate: NewAlert, summary: &mut AlertRunSummary) {
        match self.dedup.is_duplicate(&candidate).await {
            Ok(true) => {
                summary.suppressed += 1;
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(
                    rule = %rule,
                    patient_id = ?candidate.patient_id,
                    error = %e,
                    "Pending-alert check failed, skipping candidate"
                );
                summary.dedup_failures += 1;
                return;
            }
        }

        match self.alerts.create_alert(candidate).await {
            Ok(alert) => {
                tracing::info!(
                    rule = %rule,
                    alert_id = %alert.id,
                    alert_type = %alert.alert_type,
                    urgency = alert.urgency.as_str(),
                    "Alert created"
                );
                summary.created += 1;
            }
            Err(e) => {
                tracing::error!(rule = %rule, error = %e, "Failed to store alert");
                summary.write_failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::{
        Alert, AlertId, AlertStatus, AlertType, ExamId, FiscalId, NewPatient, Patient, PatientId,
        PatientStatus, Result, StoreError,
    };
    use async_trait::async_trait;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn active_due_in(days: i64) -> Patient {
        let mut patient = NewPatient {
            fiscal_id: FiscalId::new("12345678901").unwrap(),
            name: "Ana Lima".into(),
            email: None,
            phone: None,
            birth_date: None,
            gender: None,
        }
        .into_patient(Utc::now());
        patient.status = PatientStatus::Active;
        patient.sessions_used = 2;
        patient.next_maintenance_date = Some(today() + Duration::days(days));
        patient
    }

    #[tokio::test]
    async fn test_rerun_is_noop_until_resolved() {
        let store = Arc::new(InMemoryStore::new());
        store.put_patient(active_due_in(3)).await;
        let engine = AlertRuleEngine::new(store.clone(), store.clone(), AlertThresholds::default());

        let first = engine.evaluate_at(today()).await;
        assert_eq!(first.created, 1);

        let second = engine.evaluate_at(today()).await;
        assert_eq!(second.created, 0);
        assert_eq!(second.suppressed, 1);

        let pending = store.list_alerts(Some(AlertStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].alert_type, AlertType::Maintenance);
        store
            .set_alert_status(pending[0].id, AlertStatus::Resolved, None)
            .await
            .unwrap();

        let third = engine.evaluate_at(today()).await;
        assert_eq!(third.created, 1);
    }

    /// Alert store whose pending check always fails
    struct BrokenAlertStore {
        inner: InMemoryStore,
    }

    #[async_trait]
    impl AlertStore for BrokenAlertStore {
        async fn exists_pending(
            &self,
            _: AlertType,
            _: PatientId,
            _: Option<ExamId>,
        ) -> Result<bool> {
            Err(StoreError::QueryFailed("statement timeout".into()).into())
        }
        async fn create_alert(&self, alert: NewAlert) -> Result<Alert> {
            self.inner.create_alert(alert).await
        }
        async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<Alert>> {
            self.inner.list_alerts(status).await
        }
        async fn set_alert_status(
            &self,
            id: AlertId,
            status: AlertStatus,
            resolved_by: Option<&str>,
        ) -> Result<Alert> {
            self.inner.set_alert_status(id, status, resolved_by).await
        }
    }

    #[tokio::test]
    async fn test_dedup_failure_fails_closed() {
        let clinic = Arc::new(InMemoryStore::new());
        clinic.put_patient(active_due_in(3)).await;
        let alerts = Arc::new(BrokenAlertStore {
            inner: InMemoryStore::new(),
        });
        let engine = AlertRuleEngine::new(clinic, alerts.clone(), AlertThresholds::default());

        let summary = engine.evaluate_at(today()).await;

        assert_eq!(summary.candidates, 1);
        assert_eq!(summary.dedup_failures, 1);
        assert_eq!(summary.created, 0);
        assert!(alerts.inner.list_alerts(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = AlertRunSummary {
            dedup_failures: 2,
            ..Default::default()
        };
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["dedupFailures"], 2);
        assert!(summary.has_failures());
    }
}
