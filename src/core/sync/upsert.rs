//! Idempotent patient/exam writes
//!
//! Lookup-then-write is only a fast path; the storage unique constraints on
//! fiscal id and external exam id are what keep reruns from duplicating rows.

use crate::adapters::database::ClinicStore;
use crate::core::mapping::MappedExam;
use crate::domain::{Exam, ExamData, ExamId, ExamSyncError, PatientId, Result};
use chrono::Utc;
use std::sync::Arc;

/// Result of writing one mapped record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub patient_id: PatientId,
    pub exam_id: ExamId,
    /// `false` when an existing exam was overwritten
    pub created: bool,
    pub patient_created: bool,
}

pub struct UpsertEngine {
    store: Arc<dyn ClinicStore>,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Resolve or create the patient, then insert or overwrite the exam
    ///
    /// # Errors
    ///
    /// Every storage failure is reported as `ExamSyncError::Write`.
    pub async fn upsert(&self, mapped: MappedExam) -> Result<UpsertOutcome> {
        let MappedExam {
            fiscal_id,
            patient,
            exam,
        } = mapped;

        let (patient_id, patient_created) = match self
            .store
            .find_patient_by_fiscal_id(&fiscal_id)
            .await
            .map_err(|e| write_error("patient lookup", e))?
        {
            Some(existing) => (existing.id, false),
            None => {
                let new_patient = patient.into_patient(Utc::now());
                match self.store.insert_patient(&new_patient).await {
                    Ok(()) => {
                        tracing::info!(
                            patient_id = %new_patient.id,
                            fiscal_id = %fiscal_id.masked(),
                            "Created lead patient"
                        );
                        (new_patient.id, true)
                    }
                    Err(e) if e.is_unique_violation() => {
                        tracing::debug!(
                            fiscal_id = %fiscal_id.masked(),
                            "Patient created concurrently, reusing"
                        );
                        let existing = self
                            .store
                            .find_patient_by_fiscal_id(&fiscal_id)
                            .await
                            .map_err(|e| write_error("patient lookup", e))?
                            .ok_or_else(|| {
                                ExamSyncError::Write(format!(
                                    "patient {} vanished after unique violation",
                                    fiscal_id.masked()
                                ))
                            })?;
                        (existing.id, false)
                    }
                    Err(e) => return Err(write_error("patient insert", e)),
                }
            }
        };

        let (exam_id, created) = self.write_exam(patient_id, exam).await?;

        Ok(UpsertOutcome {
            patient_id,
            exam_id,
            created,
            patient_created,
        })
    }

    async fn write_exam(&self, patient_id: PatientId, data: ExamData) -> Result<(ExamId, bool)> {
        if let Some(existing) = self
            .store
            .find_exam_by_external_id(&data.external_exam_id)
            .await
            .map_err(|e| write_error("exam lookup", e))?
        {
            self.overwrite(existing.id, patient_id, &data).await?;
            return Ok((existing.id, false));
        }

        let exam = Exam {
            id: ExamId::new_v4(),
            patient_id,
            data,
            created_at: Utc::now(),
        };

        match self.store.insert_exam(&exam).await {
            Ok(()) => Ok((exam.id, true)),
            Err(e) if e.is_unique_violation() => {
                let existing = self
                    .store
                    .find_exam_by_external_id(exam.external_exam_id())
                    .await
                    .map_err(|e| write_error("exam lookup", e))?
                    .ok_or_else(|| {
                        ExamSyncError::Write(format!(
                            "exam {} vanished after unique violation",
                            exam.external_exam_id()
                        ))
                    })?;
                self.overwrite(existing.id, patient_id, &exam.data).await?;
                Ok((existing.id, false))
            }
            Err(e) => Err(write_error("exam insert", e)),
        }
    }

    async fn overwrite(&self, id: ExamId, patient_id: PatientId, data: &ExamData) -> Result<()> {
        self.store
            .update_exam(id, patient_id, data)
            .await
            .map_err(|e| write_error("exam update", e))?;
        tracing::debug!(exam_id = %id, external_exam_id = %data.external_exam_id, "Exam overwritten");
        Ok(())
    }
}

fn write_error(stage: &str, error: ExamSyncError) -> ExamSyncError {
    ExamSyncError::Write(format!("{stage}: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryStore;
    use crate::domain::{
        ExamStatus, ExamType, ExternalExamId, FiscalId, NewPatient, Patient, PatientStatus,
        StoreError,
    };
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn mapped(fiscal: &str, external: &str, ido: Option<f64>) -> MappedExam {
        let fiscal_id = FiscalId::new(fiscal).unwrap();
        MappedExam {
            fiscal_id: fiscal_id.clone(),
            patient: NewPatient {
                fiscal_id,
                name: "Maria Souza".into(),
                email: None,
                phone: None,
                birth_date: None,
                gender: None,
            },
            exam: ExamData {
                external_exam_id: ExternalExamId::new(external).unwrap(),
                exam_type: ExamType::Sleep,
                status: ExamStatus::Done,
                exam_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                weight_kg: None,
                height_cm: None,
                bmi: None,
                snoring_score: None,
                desaturation_index: ido,
                desaturation_category: None,
                spo2_min: None,
                spo2_avg: None,
                spo2_max: None,
            },
        }
    }

    #[tokio::test]
    async fn test_first_write_creates_patient_and_exam() {
        let store = Arc::new(InMemoryStore::new());
        let engine = UpsertEngine::new(store.clone());

        let outcome = engine
            .upsert(mapped("12345678901", "EX-1", None))
            .await
            .unwrap();

        assert!(outcome.created);
        assert!(outcome.patient_created);
        let patient = store
            .find_patient_by_fiscal_id(&FiscalId::new("12345678901").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patient.status, PatientStatus::Lead);
        assert_eq!(patient.sessions_used, 0);
    }

    #[tokio::test]
    async fn test_rerun_overwrites_exam() {
        let store = Arc::new(InMemoryStore::new());
        let engine = UpsertEngine::new(store.clone());

        let first = engine
            .upsert(mapped("12345678901", "EX-1", Some(10.0)))
            .await
            .unwrap();
        let second = engine
            .upsert(mapped("12345678901", "EX-1", Some(12.5)))
            .await
            .unwrap();

        assert!(!second.created);
        assert!(!second.patient_created);
        assert_eq!(first.exam_id, second.exam_id);
        assert_eq!(store.patient_count().await, 1);
        assert_eq!(store.exam_count().await, 1);

        let exam = store
            .find_exam_by_external_id(&ExternalExamId::new("EX-1").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exam.data.desaturation_index, Some(12.5));
    }

    #[tokio::test]
    async fn test_second_exam_reuses_patient() {
        let store = Arc::new(InMemoryStore::new());
        let engine = UpsertEngine::new(store.clone());

        let a = engine
            .upsert(mapped("12345678901", "EX-1", None))
            .await
            .unwrap();
        let b = engine
            .upsert(mapped("12345678901", "EX-2", None))
            .await
            .unwrap();

        assert_eq!(a.patient_id, b.patient_id);
        assert!(b.created);
        assert_eq!(store.exam_count().await, 2);
    }

    /// Hides the first patient lookup to simulate a concurrent writer
    struct RacingStore {
        inner: InMemoryStore,
        hide_next_lookup: AtomicBool,
    }

    #[async_trait]
    impl ClinicStore for RacingStore {
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
        async fn find_patient_by_fiscal_id(&self, id: &FiscalId) -> Result<Option<Patient>> {
            if self.hide_next_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_patient_by_fiscal_id(id).await
        }
        async fn insert_patient(&self, patient: &Patient) -> Result<()> {
            self.inner.insert_patient(patient).await
        }
        async fn find_exam_by_external_id(&self, id: &ExternalExamId) -> Result<Option<Exam>> {
            self.inner.find_exam_by_external_id(id).await
        }
        async fn insert_exam(&self, exam: &Exam) -> Result<()> {
            self.inner.insert_exam(exam).await
        }
        async fn update_exam(&self, id: ExamId, patient_id: PatientId, data: &ExamData) -> Result<()> {
            self.inner.update_exam(id, patient_id, data).await
        }
        async fn patients_with_status(&self, status: PatientStatus) -> Result<Vec<Patient>> {
            self.inner.patients_with_status(status).await
        }
        async fn exams_for_patient(&self, patient_id: PatientId) -> Result<Vec<Exam>> {
            self.inner.exams_for_patient(patient_id).await
        }
        async fn severe_exams_since(&self, since: NaiveDate) -> Result<Vec<Exam>> {
            self.inner.severe_exams_since(since).await
        }
    }

    #[tokio::test]
    async fn test_unique_violation_on_patient_falls_back_to_lookup() {
        let store = Arc::new(RacingStore {
            inner: InMemoryStore::new(),
            hide_next_lookup: AtomicBool::new(false),
        });
        let engine = UpsertEngine::new(store.clone());
        let first = engine
            .upsert(mapped("12345678901", "EX-1", None))
            .await
            .unwrap();

        store.hide_next_lookup.store(true, Ordering::SeqCst);
        let second = engine
            .upsert(mapped("12345678901", "EX-2", None))
            .await
            .unwrap();

        assert_eq!(first.patient_id, second.patient_id);
        assert!(!second.patient_created);
        assert_eq!(store.inner.patient_count().await, 1);
    }

    struct FailingStore;

    #[async_trait]
    impl ClinicStore for FailingStore {
        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
        async fn find_patient_by_fiscal_id(&self, _: &FiscalId) -> Result<Option<Patient>> {
            Err(StoreError::ConnectionFailed("pool exhausted".into()).into())
        }
        async fn insert_patient(&self, _: &Patient) -> Result<()> {
            unreachable!()
        }
        async fn find_exam_by_external_id(&self, _: &ExternalExamId) -> Result<Option<Exam>> {
            unreachable!()
        }
        async fn insert_exam(&self, _: &Exam) -> Result<()> {
            unreachable!()
        }
        async fn update_exam(&self, _: ExamId, _: PatientId, _: &ExamData) -> Result<()> {
            unreachable!()
        }
        async fn patients_with_status(&self, _: PatientStatus) -> Result<Vec<Patient>> {
            unreachable!()
        }
        async fn exams_for_patient(&self, _: PatientId) -> Result<Vec<Exam>> {
            unreachable!()
        }
        async fn severe_exams_since(&self, _: NaiveDate) -> Result<Vec<Exam>> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_storage_failure_is_write_error() {
        let engine = UpsertEngine::new(Arc::new(FailingStore));
        let err = engine
            .upsert(mapped("12345678901", "EX-1", None))
            .await
            .unwrap_err();
        assert!(matches!(err, ExamSyncError::Write(_)));
        assert!(!err.is_fatal());
    }
}
