//! Domain models and types for examsync.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`FiscalId`], [`ExternalExamId`], [`PatientId`], [`ExamId`], [`AlertId`])
//! - **Domain models** ([`Patient`], [`Exam`], [`Alert`])
//! - **Error types** ([`ExamSyncError`], [`ProviderError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! Stored enum values are lowercase English words (`lead`, `done`, `pending`, ...);
//! provider numeric codes are translated with the `from_code` constructors.
//!
//! ```rust
//! use examsync::domain::{ExamStatus, FiscalId};
//!
//! assert_eq!(ExamStatus::from_code(6), Some(ExamStatus::Done));
//! assert!(FiscalId::new("12345678901").is_ok());
//! ```

pub mod alert;
pub mod errors;
pub mod exam;
pub mod ids;
pub mod patient;
pub mod result;

// Re-export commonly used types for convenience
pub use alert::{Alert, AlertStatus, AlertType, AlertUrgency, NewAlert};
pub use errors::{ExamSyncError, ProviderError, StoreError};
pub use exam::{DesaturationCategory, Exam, ExamData, ExamStatus, ExamType};
pub use ids::{AlertId, ExamId, ExternalExamId, FiscalId, PatientId};
pub use patient::{Gender, NewPatient, Patient, PatientStatus};
pub use result::Result;
