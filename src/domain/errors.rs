//! Domain error types
//!
//! This module defines the error hierarchy for examsync. Provider and storage
//! errors keep their HTTP/SQL detail in dedicated enums; the top-level
//! [`ExamSyncError`] carries the run-level taxonomy (auth, fetch, mapping,
//! write, dedup check) that decides whether a failure aborts a run.
//! None of these types expose third-party error types.

use thiserror::Error;

/// Main examsync error type
///
/// This is the primary error type used throughout the application.
#[derive(Debug, Error)]
pub enum ExamSyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider (Biologix API) errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Storage errors
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Credential exchange failed or the session could not be renewed
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Listing exams failed after retries
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A single raw record could not be mapped to domain records
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Storage rejected an insert or update for a single record
    #[error("Write error: {0}")]
    Write(String),

    /// Alert existence query failed
    #[error("Dedup check error: {0}")]
    DedupCheck(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ExamSyncError {
    /// Whether this error must abort a whole sync run.
    ///
    /// Mapping and write errors are isolated per record and never abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExamSyncError::Configuration(_)
                | ExamSyncError::Auth(_)
                | ExamSyncError::Fetch(_)
                | ExamSyncError::Provider(_)
        )
    }

    /// Whether the error came from an HTTP 401 answered by the provider.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ExamSyncError::Provider(ProviderError::Unauthorized(_)))
    }

    /// Whether storage rejected a write because of a unique constraint.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, ExamSyncError::Store(StoreError::UniqueViolation(_)))
    }

    /// Whether repeating the same call may succeed.
    ///
    /// Rejected credentials and 401s need a new session, not a retry. Bodies
    /// that do not parse and 4xx answers other than 408 and 429 come back the
    /// same on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExamSyncError::Provider(ProviderError::RequestFailed { status, .. }) => {
                !(400..=499).contains(status) || *status == 408 || *status == 429
            }
            ExamSyncError::Configuration(_)
            | ExamSyncError::Validation(_)
            | ExamSyncError::Mapping(_)
            | ExamSyncError::Provider(
                ProviderError::Unauthorized(_)
                | ProviderError::AuthenticationFailed(_)
                | ProviderError::InvalidResponse(_)
                | ProviderError::MissingSessionToken(_),
            ) => false,
            _ => true,
        }
    }
}

/// Biologix provider errors
///
/// Errors that occur when talking to the provider API.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Credential exchange rejected
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Session endpoint answered 2xx without the token header
    #[error("Session token header '{0}' missing from response")]
    MissingSessionToken(String),

    /// 401 on an authenticated call
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to reach the provider
    #[error("Failed to connect to provider: {0}")]
    ConnectionFailed(String),

    /// Non-2xx answer other than 401
    #[error("Request failed: {status} - {message}")]
    RequestFailed { status: u16, message: String },

    /// Body or headers could not be parsed
    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),
}

/// Storage errors
///
/// Errors raised by the persistence adapters (PostgreSQL or in-memory).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Query or statement failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool or connection failure
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Row expected but absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row held a value the domain cannot represent
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

// Conversion from std::io::Error
impl From<std::io::Error> for ExamSyncError {
    fn from(err: std::io::Error) -> Self {
        ExamSyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ExamSyncError {
    fn from(err: serde_json::Error) -> Self {
        ExamSyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ExamSyncError {
    fn from(err: toml::de::Error) -> Self {
        ExamSyncError::Configuration(format!("TOML parse error: {err}"))
    }
}
