//! Sync run summary and scheduler output

use crate::core::alerts::AlertRunSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Longest reason kept per entry in `error_details`
pub const MAX_REASON_CHARS: usize = 200;

/// Entries of `error_details` echoed in the run output
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Lifecycle of one sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Authenticating,
    Fetching,
    Processing,
    Completed,
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Idle => "idle",
            SyncState::Authenticating => "authenticating",
            SyncState::Fetching => "fetching",
            SyncState::Processing => "processing",
            SyncState::Completed => "completed",
            SyncState::Failed => "failed",
        }
    }

    /// Forward-only transitions; any non-terminal state may fail
    pub fn can_transition_to(&self, next: SyncState) -> bool {
        use SyncState::*;
        matches!(
            (self, next),
            (Idle, Authenticating)
                | (Authenticating, Fetching)
                | (Fetching, Processing)
                | (Processing, Completed)
                | (Idle | Authenticating | Fetching | Processing, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncState::Completed | SyncState::Failed)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters of a finished sync run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    /// Completed records received from the provider
    pub total: usize,
    /// Records mapped and written
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    /// One truncated reason per failed record
    pub error_details: Vec<String>,
    pub duration: Duration,
    pub final_state: SyncState,
}

impl SyncSummary {
    pub fn new() -> Self {
        Self {
            total: 0,
            processed: 0,
            created: 0,
            updated: 0,
            errors: 0,
            error_details: Vec::new(),
            duration: Duration::ZERO,
            final_state: SyncState::Idle,
        }
    }

    pub fn record_success(&mut self, created: bool) {
        self.processed += 1;
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }

    pub fn record_failure(&mut self, exam_id: &str, reason: &str) {
        self.errors += 1;
        self.error_details
            .push(format!("{exam_id}: {}", truncate_reason(reason)));
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total = self.total,
            processed = self.processed,
            created = self.created,
            updated = self.updated,
            errors = self.errors,
            duration_ms = self.duration.as_millis() as u64,
            final_state = %self.final_state,
            "Sync completed"
        );

        if self.has_errors() {
            tracing::warn!(error_count = self.errors, "Sync completed with record errors");
        }
    }
}

impl Default for SyncSummary {
    fn default() -> Self {
        Self::new()
    }
}

/// Cut a reason to [`MAX_REASON_CHARS`] characters
pub fn truncate_reason(reason: &str) -> String {
    match reason.char_indices().nth(MAX_REASON_CHARS) {
        Some((cut, _)) => reason[..cut].to_string(),
        None => reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessOutput {
    pub success: bool,
    pub total: usize,
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub errors: usize,
    pub error_details: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<AlertRunSummary>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureOutput {
    pub success: bool,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

/// JSON document printed for the scheduler
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunOutput {
    Success(SuccessOutput),
    Failure(FailureOutput),
}

impl RunOutput {
    pub fn success(
        summary: &SyncSummary,
        alerts: Option<AlertRunSummary>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        RunOutput::Success(SuccessOutput {
            success: true,
            total: summary.total,
            processed: summary.processed,
            created: summary.created,
            updated: summary.updated,
            errors: summary.errors,
            error_details: summary
                .error_details
                .iter()
                .take(MAX_REPORTED_ERRORS)
                .cloned()
                .collect(),
            alerts,
            timestamp,
        })
    }

    pub fn failure(error: impl fmt::Display, timestamp: DateTime<Utc>) -> Self {
        RunOutput::Failure(FailureOutput {
            success: false,
            error: error.to_string(),
            timestamp,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutput::Success(_))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
