//! Paginated retrieval of completed exam records

use crate::adapters::biologix::{ExamPage, ExamProvider, RawExamRecord, Session, SessionManager};
use crate::core::retry::RetryPolicy;
use crate::domain::{ExamStatus, ExamSyncError, ProviderError, Result};
use futures::stream::{self, Stream, TryStreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters collected while fetching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchStats {
    pub pages_requested: u64,
    pub raw_records: u64,
    pub completed_records: u64,
}

#[derive(Default)]
struct FetchCounters {
    pages_requested: AtomicU64,
    raw_records: AtomicU64,
    completed_records: AtomicU64,
}

/// Cursor of the page loop
#[derive(Debug, Clone, Copy)]
enum Cursor {
    At(u64),
    Done,
}

/// Walks the provider's exam listing page by page
///
/// Only records with the completed status code are yielded.
pub struct ExternalRecordFetcher {
    provider: Arc<dyn ExamProvider>,
    sessions: Arc<SessionManager>,
    retry: RetryPolicy,
    page_size: u64,
    counters: FetchCounters,
}

impl ExternalRecordFetcher {
    pub fn new(
        provider: Arc<dyn ExamProvider>,
        sessions: Arc<SessionManager>,
        retry: RetryPolicy,
        page_size: u64,
    ) -> Self {
        Self {
            provider,
            sessions,
            retry,
            page_size: page_size.max(1),
            counters: FetchCounters::default(),
        }
    }

    /// Lazy stream of completed records
    ///
    /// A page is requested only when the previous one has been consumed. The
    /// first error ends the stream.
    pub fn records(&self) -> impl Stream<Item = Result<RawExamRecord>> + '_ {
        stream::try_unfold(Cursor::At(0), move |cursor| self.next_page(cursor))
            .map_ok(|records| stream::iter(records.into_iter().map(Ok::<_, ExamSyncError>)))
            .try_flatten()
    }

    /// Drains [`records`](Self::records) into a vector
    pub async fn fetch_all_completed_records(&self) -> Result<Vec<RawExamRecord>> {
        let records: Vec<RawExamRecord> = self.records().try_collect().await?;
        let stats = self.stats();
        tracing::info!(
            pages = stats.pages_requested,
            raw_records = stats.raw_records,
            completed_records = stats.completed_records,
            "Exam listing fetched"
        );
        Ok(records)
    }

    pub fn stats(&self) -> FetchStats {
        FetchStats {
            pages_requested: self.counters.pages_requested.load(Ordering::Relaxed),
            raw_records: self.counters.raw_records.load(Ordering::Relaxed),
            completed_records: self.counters.completed_records.load(Ordering::Relaxed),
        }
    }

    async fn next_page(&self, cursor: Cursor) -> Result<Option<(Vec<RawExamRecord>, Cursor)>> {
        let offset = match cursor {
            Cursor::At(offset) => offset,
            Cursor::Done => return Ok(None),
        };

        let page = self.fetch_page_at(offset).await?;
        let next = self.next_cursor(offset, &page);
        Ok(Some((self.keep_completed(page.records), next)))
    }

    fn next_cursor(&self, offset: u64, page: &ExamPage) -> Cursor {
        if page.records.is_empty() {
            return Cursor::Done;
        }
        let limit = if page.pagination.limit > 0 {
            page.pagination.limit
        } else {
            self.page_size
        };
        let next = offset.saturating_add(limit);
        if next >= page.pagination.total {
            Cursor::Done
        } else {
            Cursor::At(next)
        }
    }

    fn keep_completed(&self, records: Vec<RawExamRecord>) -> Vec<RawExamRecord> {
        let raw = records.len() as u64;
        let completed: Vec<RawExamRecord> = records
            .into_iter()
            .filter(|r| r.status == ExamStatus::COMPLETED_CODE)
            .collect();

        self.counters.raw_records.fetch_add(raw, Ordering::Relaxed);
        self.counters
            .completed_records
            .fetch_add(completed.len() as u64, Ordering::Relaxed);
        tracing::debug!(
            raw = raw,
            completed = completed.len(),
            "Filtered page to completed exams"
        );
        completed
    }

    /// One page, with a single session renewal on 401
    async fn fetch_page_at(&self, offset: u64) -> Result<ExamPage> {
        let session = self
            .sessions
            .ensure_valid_session()
            .await
            .map_err(|e| session_error(offset, e))?;

        match self.request_page(&session, offset).await {
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(offset, "Provider answered 401, renewing session");
                let renewed = self
                    .retry
                    .run("renew_session", || self.sessions.renew())
                    .await
                    .map_err(|e| session_error(offset, e))?;

                self.request_page(&renewed, offset).await.map_err(|e| {
                    if e.is_unauthorized() {
                        ExamSyncError::Auth(format!(
                            "renewed session rejected at offset {offset}: {e}"
                        ))
                    } else {
                        fetch_error(offset, e)
                    }
                })
            }
            Err(e) => Err(fetch_error(offset, e)),
            Ok(page) => Ok(page),
        }
    }

    async fn request_page(&self, session: &Session, offset: u64) -> Result<ExamPage> {
        let limit = self.page_size;
        self.retry
            .run("fetch_page", || {
                self.counters.pages_requested.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(offset, limit, "Requesting exam page");
                self.provider.fetch_page(session, offset, limit)
            })
            .await
    }
}

fn fetch_error(offset: u64, error: ExamSyncError) -> ExamSyncError {
    ExamSyncError::Fetch(format!("exam page at offset {offset}: {error}"))
}

/// Rejected credentials stay `Auth`; transport failures while opening a
/// session are reported against the page being fetched
fn session_error(offset: u64, error: ExamSyncError) -> ExamSyncError {
    match error {
        ExamSyncError::Auth(_) => error,
        ExamSyncError::Provider(
            ProviderError::AuthenticationFailed(_)
            | ProviderError::Unauthorized(_)
            | ProviderError::MissingSessionToken(_),
        ) => ExamSyncError::Auth(error.to_string()),
        other => fetch_error(offset, other),
    }
}
