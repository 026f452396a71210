//! One end-to-end sync run
//!
//! `Idle -> Authenticating -> Fetching -> Processing -> Completed`, or
//! `Failed` from any non-terminal state. Authentication and fetch failures
//! abort the run; mapping and write failures are counted per record.

use super::fetcher::ExternalRecordFetcher;
use super::summary::{SyncState, SyncSummary};
use super::upsert::UpsertEngine;
use crate::adapters::biologix::SessionManager;
use crate::core::mapping::MappedRecords;
use crate::core::retry::RetryPolicy;
use crate::domain::{ExamSyncError, Result};
use crate::log_record_failure;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Tracks and logs the run state
struct StateMachine {
    current: SyncState,
}

impl StateMachine {
    fn new() -> Self {
        Self {
            current: SyncState::Idle,
        }
    }

    fn advance(&mut self, next: SyncState) {
        debug_assert!(
            self.current.can_transition_to(next),
            "invalid sync transition {} -> {}",
            self.current,
            next
        );
        tracing::info!(from = %self.current, to = %next, "Sync state transition");
        self.current = next;
    }

    fn fail(&mut self, error: ExamSyncError) -> ExamSyncError {
        tracing::error!(state = %self.current, error = %error, "Sync run failed");
        self.advance(SyncState::Failed);
        error
    }
}

/// Drives authentication, fetching and per-record processing
pub struct SyncOrchestrator {
    sessions: Arc<SessionManager>,
    fetcher: ExternalRecordFetcher,
    upsert: UpsertEngine,
    retry: RetryPolicy,
}

impl SyncOrchestrator {
    pub fn new(
        sessions: Arc<SessionManager>,
        fetcher: ExternalRecordFetcher,
        upsert: UpsertEngine,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            sessions,
            fetcher,
            upsert,
            retry,
        }
    }

    pub async fn run(&self) -> Result<SyncSummary> {
        self.run_at(Utc::now().date_naive()).await
    }

    /// Run with `today` used as the fallback exam date
    ///
    /// # Errors
    ///
    /// `ExamSyncError::Auth` or `ExamSyncError::Fetch` when the run aborts.
    pub async fn run_at(&self, today: NaiveDate) -> Result<SyncSummary> {
        let started = Instant::now();
        let mut state = StateMachine::new();

        state.advance(SyncState::Authenticating);
        self.retry
            .run("open_session", || self.sessions.ensure_valid_session())
            .await
            .map_err(|e| state.fail(as_auth_error(e)))?;

        state.advance(SyncState::Fetching);
        let records = self
            .fetcher
            .fetch_all_completed_records()
            .await
            .map_err(|e| state.fail(e))?;

        state.advance(SyncState::Processing);
        let mut summary = SyncSummary::new();
        for (exam_id, mapped) in MappedRecords::new(records, today) {
            summary.total += 1;

            let result = match mapped {
                Ok(mapped) => self.upsert.upsert(mapped).await,
                Err(e) => Err(e),
            };

            match result {
                Ok(outcome) => {
                    tracing::debug!(
                        exam_id = %exam_id,
                        created = outcome.created,
                        patient_created = outcome.patient_created,
                        "Record synced"
                    );
                    summary.record_success(outcome.created);
                }
                Err(e) => {
                    let stage = match e {
                        ExamSyncError::Mapping(_) => "mapping",
                        _ => "write",
                    };
                    log_record_failure!(exam_id, stage, e);
                    summary.record_failure(&exam_id, &e.to_string());
                }
            }
        }

        state.advance(SyncState::Completed);
        summary.final_state = state.current;
        summary.duration = started.elapsed();
        summary.log_summary();
        Ok(summary)
    }
}

fn as_auth_error(error: ExamSyncError) -> ExamSyncError {
    match error {
        ExamSyncError::Auth(_) => error,
        other => ExamSyncError::Auth(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::biologix::models::{RawOximetry, RawPatient, RawResult};
    use crate::adapters::biologix::{ExamPage, ExamProvider, Pagination, RawExamRecord, Session};
    use crate::adapters::database::ClinicStore;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::{ExternalExamId, ProviderError};
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticProvider {
        records: Vec<RawExamRecord>,
        reject_credentials: bool,
    }

    #[async_trait]
    impl ExamProvider for StaticProvider {
        async fn open_session(&self) -> Result<Session> {
            if self.reject_credentials {
                return Err(ProviderError::AuthenticationFailed("401".into()).into());
            }
            Ok(Session {
                session_id: "s".into(),
                user_id: "1".into(),
                token: "t".into(),
                token_issued_at: Utc::now(),
            })
        }

        async fn fetch_page(&self, _: &Session, _: u64, _: u64) -> Result<ExamPage> {
            Ok(ExamPage {
                records: self.records.clone(),
                pagination: Pagination {
                    total: self.records.len() as u64,
                    limit: 100,
                    offset: 0,
                },
            })
        }
    }

    fn record(exam_id: &str, username: &str) -> RawExamRecord {
        RawExamRecord {
            exam_id: exam_id.into(),
            status: 6,
            exam_type: 1,
            start_time: Some("2024-05-02T22:10:00Z".into()),
            patient: RawPatient {
                name: Some("Paciente Teste".into()),
                username: Some(username.into()),
                ..Default::default()
            },
            result: Some(RawResult {
                snoring: None,
                oximetry: Some(RawOximetry {
                    odi: Some(12.0),
                    odi_category: Some(1),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }
    }

    fn orchestrator(provider: StaticProvider, store: Arc<InMemoryStore>) -> SyncOrchestrator {
        let provider: Arc<dyn ExamProvider> = Arc::new(provider);
        let sessions = Arc::new(SessionManager::new(provider.clone(), 6));
        let retry = RetryPolicy::new(1, Duration::from_millis(1), 2.0, Duration::from_millis(1));
        let fetcher = ExternalRecordFetcher::new(provider, sessions.clone(), retry.clone(), 100);
        SyncOrchestrator::new(sessions, fetcher, UpsertEngine::new(store), retry)
    }

    #[tokio::test]
    async fn test_bad_record_is_isolated() {
        let store = Arc::new(InMemoryStore::new());
        let provider = StaticProvider {
            records: vec![
                record("EX-1", "11111111111"),
                record("EX-2", "22222222222"),
                record("EX-3", "no-digits"),
                record("EX-4", "44444444444"),
                record("EX-5", "55555555555"),
            ],
            reject_credentials: false,
        };

        let summary = orchestrator(provider, store.clone()).run().await.unwrap();

        assert_eq!(summary.total, 5);
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.created, 4);
        assert_eq!(summary.errors, 1);
        assert!(summary.error_details[0].starts_with("EX-3: "));
        assert_eq!(summary.final_state, SyncState::Completed);
        assert_eq!(store.exam_count().await, 4);
    }

    #[tokio::test]
    async fn test_second_run_updates() {
        let store = Arc::new(InMemoryStore::new());
        let records = vec![record("EX-1", "11111111111"), record("EX-2", "11111111111")];

        let first = orchestrator(
            StaticProvider {
                records: records.clone(),
                reject_credentials: false,
            },
            store.clone(),
        )
        .run()
        .await
        .unwrap();
        let second = orchestrator(
            StaticProvider {
                records,
                reject_credentials: false,
            },
            store.clone(),
        )
        .run()
        .await
        .unwrap();

        assert_eq!(first.created, 2);
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.patient_count().await, 1);
        assert_eq!(store.exam_count().await, 2);
    }

    #[tokio::test]
    async fn test_rejected_credentials_abort_run() {
        let store = Arc::new(InMemoryStore::new());
        let provider = StaticProvider {
            records: vec![record("EX-1", "11111111111")],
            reject_credentials: true,
        };

        let err = orchestrator(provider, store.clone()).run().await.unwrap_err();

        assert!(matches!(err, ExamSyncError::Auth(_)));
        assert!(err.is_fatal());
        assert_eq!(store.exam_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_start_time_uses_run_date() {
        let store = Arc::new(InMemoryStore::new());
        let mut raw = record("EX-1", "11111111111");
        raw.start_time = None;
        let today = NaiveDate::from_ymd_opt(2024, 7, 9).unwrap();

        orchestrator(
            StaticProvider {
                records: vec![raw],
                reject_credentials: false,
            },
            store.clone(),
        )
        .run_at(today)
        .await
        .unwrap();

        let exam = store
            .find_exam_by_external_id(&ExternalExamId::new("EX-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exam.data.exam_date, today);
    }
}
