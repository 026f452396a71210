//! Logging and observability
//!
//! Structured logging built on `tracing`:
//! - Human-readable console output on stderr
//! - Optional JSON file logs with rotation
//! - Level from configuration, overridable with `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use examsync::logging::init_logging;
//! use examsync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(partner_id = "P-1", "Sync started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use examsync::log_retry_attempt;
///
/// log_retry_attempt!("fetch_page", 1, 3, 2000u64, "connection reset");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($operation:expr, $attempt:expr, $max_retries:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            operation = $operation,
            attempt = $attempt,
            max_retries = $max_retries,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Operation failed, retrying"
        );
    };
}

/// Log a record that could not be mapped or written
///
/// # Example
///
/// ```no_run
/// use examsync::log_record_failure;
///
/// log_record_failure!("EX-123", "mapping", "fiscal id not found");
/// ```
#[macro_export]
macro_rules! log_record_failure {
    ($exam_id:expr, $stage:expr, $error:expr) => {
        tracing::error!(
            exam_id = %$exam_id,
            stage = $stage,
            error = %$error,
            "Record processing failed"
        );
    };
}
