//! In-memory store
//!
//! Used by `sync --dry-run` and by tests. Enforces the same unique
//! constraints as the PostgreSQL schema.

use crate::adapters::database::traits::{already_closed, AlertStore, ClinicStore};
use crate::domain::{
    Alert, AlertId, AlertStatus, AlertType, DesaturationCategory, Exam, ExamData, ExamId,
    ExamSyncError, ExternalExamId, FiscalId, NewAlert, Patient, PatientId, PatientStatus, Result,
    StoreError,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    patients: HashMap<PatientId, Patient>,
    exams: HashMap<ExamId, Exam>,
    alerts: Vec<Alert>,
}

/// Volatile [`ClinicStore`] and [`AlertStore`] implementation
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn patient_count(&self) -> usize {
        self.tables.read().await.patients.len()
    }

    pub async fn exam_count(&self) -> usize {
        self.tables.read().await.exams.len()
    }

    /// Inserts or replaces a patient without constraint checks
    ///
    /// Lets callers seed state the sync engine never writes (status,
    /// sessions, maintenance dates).
    pub async fn put_patient(&self, patient: Patient) {
        self.tables.write().await.patients.insert(patient.id, patient);
    }

    /// Inserts or replaces an exam without constraint checks
    pub async fn put_exam(&self, exam: Exam) {
        self.tables.write().await.exams.insert(exam.id, exam);
    }
}

#[async_trait]
impl ClinicStore for InMemoryStore {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn find_patient_by_fiscal_id(&self, fiscal_id: &FiscalId) -> Result<Option<Patient>> {
        let tables = self.tables.read().await;
        Ok(tables
            .patients
            .values()
            .find(|p| p.fiscal_id.as_ref() == Some(fiscal_id))
            .cloned())
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(fiscal_id) = &patient.fiscal_id {
            if tables
                .patients
                .values()
                .any(|p| p.fiscal_id.as_ref() == Some(fiscal_id))
            {
                return Err(StoreError::UniqueViolation(format!(
                    "pacientes.fiscal_id {}",
                    fiscal_id.masked()
                ))
                .into());
            }
        }
        tables.patients.insert(patient.id, patient.clone());
        Ok(())
    }

    async fn find_exam_by_external_id(&self, external_id: &ExternalExamId) -> Result<Option<Exam>> {
        let tables = self.tables.read().await;
        Ok(tables
            .exams
            .values()
            .find(|e| e.external_exam_id() == external_id)
            .cloned())
    }

    async fn insert_exam(&self, exam: &Exam) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables
            .exams
            .values()
            .any(|e| e.external_exam_id() == exam.external_exam_id())
        {
            return Err(StoreError::UniqueViolation(format!(
                "exames.biologix_exam_id {}",
                exam.external_exam_id()
            ))
            .into());
        }
        if !tables.patients.contains_key(&exam.patient_id) {
            return Err(StoreError::QueryFailed(format!(
                "exames.paciente_id {} references no patient",
                exam.patient_id
            ))
            .into());
        }
        tables.exams.insert(exam.id, exam.clone());
        Ok(())
    }

    async fn update_exam(&self, id: ExamId, patient_id: PatientId, data: &ExamData) -> Result<()> {
        let mut tables = self.tables.write().await;
        let exam = tables
            .exams
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("exam {id}")))?;
        exam.patient_id = patient_id;
        exam.data = data.clone();
        Ok(())
    }

    async fn patients_with_status(&self, status: PatientStatus) -> Result<Vec<Patient>> {
        let tables = self.tables.read().await;
        let mut patients: Vec<Patient> = tables
            .patients
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        patients.sort_by_key(|p| p.created_at);
        Ok(patients)
    }

    async fn exams_for_patient(&self, patient_id: PatientId) -> Result<Vec<Exam>> {
        let tables = self.tables.read().await;
        let mut exams: Vec<Exam> = tables
            .exams
            .values()
            .filter(|e| e.patient_id == patient_id)
            .cloned()
            .collect();
        exams.sort_by_key(|e| (e.data.exam_date, e.created_at));
        Ok(exams)
    }

    async fn severe_exams_since(&self, since: NaiveDate) -> Result<Vec<Exam>> {
        let tables = self.tables.read().await;
        let mut exams: Vec<Exam> = tables
            .exams
            .values()
            .filter(|e| {
                e.data.desaturation_category == Some(DesaturationCategory::Severe)
                    && e.data.exam_date >= since
            })
            .cloned()
            .collect();
        exams.sort_by_key(|e| (e.data.exam_date, e.created_at));
        Ok(exams)
    }
}

#[async_trait]
impl AlertStore for InMemoryStore {
    async fn exists_pending(
        &self,
        alert_type: AlertType,
        patient_id: PatientId,
        exam_id: Option<ExamId>,
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables.alerts.iter().any(|a| {
            a.status == AlertStatus::Pending
                && a.alert_type == alert_type
                && a.patient_id == Some(patient_id)
                && exam_id.map_or(true, |id| a.exam_id == Some(id))
        }))
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert> {
        let alert = alert.into_alert(Utc::now());
        self.tables.write().await.alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<Alert>> {
        let tables = self.tables.read().await;
        let mut alerts: Vec<Alert> = tables
            .alerts
            .iter()
            .filter(|a| status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    async fn set_alert_status(
        &self,
        id: AlertId,
        status: AlertStatus,
        resolved_by: Option<&str>,
    ) -> Result<Alert> {
        if status == AlertStatus::Pending {
            return Err(ExamSyncError::Validation(
                "alerts can only be resolved or ignored".to_string(),
            ));
        }

        let mut tables = self.tables.write().await;
        let alert = tables
            .alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("alert {id}")))?;
        if alert.status != AlertStatus::Pending {
            return Err(already_closed(alert));
        }

        alert.status = status;
        alert.resolved_by = resolved_by.map(str::to_string);
        alert.resolved_at = Some(Utc::now());
        Ok(alert.clone())
    }
}
