//! Pending-alert deduplication
//!
//! A candidate is written only when no pending alert exists for the same
//! `(type, patient)`, narrowed to the exam for exam-scoped alerts. Failed
//! checks surface as `DedupCheck` errors and the engine skips the candidate.

use crate::adapters::database::AlertStore;
use crate::domain::{ExamSyncError, NewAlert, Result};
use std::sync::Arc;

pub struct AlertDeduplicator {
    store: Arc<dyn AlertStore>,
}

impl AlertDeduplicator {
    pub fn new(store: Arc<dyn AlertStore>) -> Self {
        Self { store }
    }

    /// Whether an equivalent pending alert already exists
    ///
    /// Candidates without a patient have nothing to match against and are
    /// never duplicates.
    pub async fn is_duplicate(&self, candidate: &NewAlert) -> Result<bool> {
        let Some(patient_id) = candidate.patient_id else {
            return Ok(false);
        };

        self.store
            .exists_pending(candidate.alert_type, patient_id, candidate.exam_id)
            .await
            .map_err(|e| ExamSyncError::DedupCheck(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::{AlertStatus, AlertType, AlertUrgency, PatientId};
    use serde_json::json;

    fn maintenance(patient_id: PatientId) -> NewAlert {
        NewAlert {
            alert_type: AlertType::Maintenance,
            urgency: AlertUrgency::Medium,
            title: "Maintenance upcoming".into(),
            message: "due soon".into(),
            patient_id: Some(patient_id),
            exam_id: None,
            extra_data: json!({}),
        }
    }

    #[tokio::test]
    async fn test_pending_alert_suppresses_until_resolved() {
        let store = Arc::new(InMemoryStore::new());
        let dedup = AlertDeduplicator::new(store.clone());
        let patient_id = PatientId::new_v4();

        assert!(!dedup.is_duplicate(&maintenance(patient_id)).await.unwrap());
        let alert = store.create_alert(maintenance(patient_id)).await.unwrap();
        assert!(dedup.is_duplicate(&maintenance(patient_id)).await.unwrap());

        store
            .set_alert_status(alert.id, AlertStatus::Resolved, Some("nurse"))
            .await
            .unwrap();
        assert!(!dedup.is_duplicate(&maintenance(patient_id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_patient_is_not_duplicate() {
        let store = Arc::new(InMemoryStore::new());
        let dedup = AlertDeduplicator::new(store.clone());
        store
            .create_alert(maintenance(PatientId::new_v4()))
            .await
            .unwrap();

        assert!(!dedup
            .is_duplicate(&maintenance(PatientId::new_v4()))
            .await
            .unwrap());
    }
}
