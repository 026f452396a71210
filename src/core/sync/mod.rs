//! Exam synchronization
//!
//! - [`fetcher`] - paginated, filtered retrieval from the provider
//! - [`upsert`] - idempotent patient/exam writes
//! - [`orchestrator`] - the run state machine
//! - [`summary`] - run counters and the scheduler JSON output

pub mod fetcher;
pub mod orchestrator;
pub mod summary;
pub mod upsert;

pub use fetcher::{ExternalRecordFetcher, FetchStats};
pub use orchestrator::SyncOrchestrator;
pub use summary::{RunOutput, SyncState, SyncSummary};
pub use upsert::{UpsertEngine, UpsertOutcome};
