//! Storage abstraction traits
//!
//! The sync engine and the alert rules only see storage through these two
//! narrow contracts. Implementations must enforce the unique constraints on
//! `Patient::fiscal_id` and `ExamData::external_exam_id` and report violations
//! as `StoreError::UniqueViolation`.

use crate::domain::{
    Alert, AlertId, AlertStatus, AlertType, Exam, ExamData, ExamId, ExamSyncError,
    ExternalExamId, FiscalId, NewAlert, Patient, PatientId, PatientStatus, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Patient and exam storage
#[async_trait]
pub trait ClinicStore: Send + Sync {
    /// Test the storage connection
    async fn test_connection(&self) -> Result<()>;

    async fn find_patient_by_fiscal_id(&self, fiscal_id: &FiscalId) -> Result<Option<Patient>>;

    /// Insert a new patient row
    ///
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` when the fiscal id already exists.
    async fn insert_patient(&self, patient: &Patient) -> Result<()>;

    async fn find_exam_by_external_id(&self, external_id: &ExternalExamId) -> Result<Option<Exam>>;

    /// Insert a new exam row
    ///
    /// # Errors
    ///
    /// `StoreError::UniqueViolation` when the external exam id already exists.
    async fn insert_exam(&self, exam: &Exam) -> Result<()>;

    /// Overwrite every mutable field of an existing exam
    async fn update_exam(&self, id: ExamId, patient_id: PatientId, data: &ExamData) -> Result<()>;

    async fn patients_with_status(&self, status: PatientStatus) -> Result<Vec<Patient>>;

    /// Exams of one patient ordered by exam date, then creation time
    async fn exams_for_patient(&self, patient_id: PatientId) -> Result<Vec<Exam>>;

    /// Exams with a severe desaturation category dated on or after `since`
    async fn severe_exams_since(&self, since: NaiveDate) -> Result<Vec<Exam>>;
}

/// Operational alert storage
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Whether a pending alert exists for `(alert_type, patient_id)`, narrowed
    /// to `exam_id` when one is given
    async fn exists_pending(
        &self,
        alert_type: AlertType,
        patient_id: PatientId,
        exam_id: Option<ExamId>,
    ) -> Result<bool>;

    /// Persist a candidate as a pending alert created now
    async fn create_alert(&self, alert: NewAlert) -> Result<Alert>;

    /// Alerts, newest first, optionally filtered by status
    async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<Alert>>;

    /// Close a pending alert as resolved or ignored
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` for an unknown id. A validation error when
    /// `status` is `Pending` or the alert is already closed.
    async fn set_alert_status(
        &self,
        id: AlertId,
        status: AlertStatus,
        resolved_by: Option<&str>,
    ) -> Result<Alert>;
}

/// Error for a close request on an alert that is no longer pending
pub(crate) fn already_closed(alert: &Alert) -> ExamSyncError {
    ExamSyncError::Validation(format!("alert {} is already {}", alert.id, alert.status))
}
