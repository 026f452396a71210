//! PostgreSQL adapter implementing the storage traits

use crate::adapters::database::traits::{already_closed, AlertStore, ClinicStore};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::{
    alert_from_row, category_code, exam_from_row, patient_from_row, ALERT_COLUMNS, EXAM_COLUMNS,
    PATIENT_COLUMNS,
};
use crate::domain::{
    Alert, AlertId, AlertStatus, AlertType, DesaturationCategory, Exam, ExamData, ExamId,
    ExamSyncError, ExternalExamId, FiscalId, NewAlert, Patient, PatientId, PatientStatus, Result,
    StoreError,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// PostgreSQL implementation of [`ClinicStore`] and [`AlertStore`]
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl ClinicStore for PostgreSQLAdapter {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn find_patient_by_fiscal_id(&self, fiscal_id: &FiscalId) -> Result<Option<Patient>> {
        let query = format!("SELECT {PATIENT_COLUMNS} FROM pacientes WHERE fiscal_id = $1");
        self.client
            .query_opt(&query, &[&fiscal_id.as_str()])
            .await?
            .as_ref()
            .map(patient_from_row)
            .transpose()
    }

    async fn insert_patient(&self, patient: &Patient) -> Result<()> {
        let sessions = i32::try_from(patient.sessions_used).map_err(|_| {
            ExamSyncError::Validation(format!(
                "sessions_used {} out of range",
                patient.sessions_used
            ))
        })?;

        self.client
            .execute(
                r#"
                INSERT INTO pacientes (
                    id, fiscal_id, nome, email, telefone, data_nascimento, genero,
                    status, sessoes_utilizadas, proxima_manutencao, created_at, updated_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                "#,
                &[
                    &patient.id.as_uuid(),
                    &patient.fiscal_id.as_ref().map(|f| f.as_str()),
                    &patient.name,
                    &patient.email,
                    &patient.phone,
                    &patient.birth_date,
                    &patient.gender.map(|g| g.as_str()),
                    &patient.status.as_str(),
                    &sessions,
                    &patient.next_maintenance_date,
                    &patient.created_at,
                    &patient.updated_at,
                ],
            )
            .await?;

        tracing::debug!(patient_id = %patient.id, "Inserted patient");
        Ok(())
    }

    async fn find_exam_by_external_id(&self, external_id: &ExternalExamId) -> Result<Option<Exam>> {
        let query = format!("SELECT {EXAM_COLUMNS} FROM exames WHERE biologix_exam_id = $1");
        self.client
            .query_opt(&query, &[&external_id.as_str()])
            .await?
            .as_ref()
            .map(exam_from_row)
            .transpose()
    }

    async fn insert_exam(&self, exam: &Exam) -> Result<()> {
        let data = &exam.data;
        self.client
            .execute(
                r#"
                INSERT INTO exames (
                    id, paciente_id, biologix_exam_id, tipo, status, data_exame,
                    peso_kg, altura_cm, imc, score_ronco, ido, ido_categoria,
                    spo2_min, spo2_avg, spo2_max, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                "#,
                &[
                    &exam.id.as_uuid(),
                    &exam.patient_id.as_uuid(),
                    &data.external_exam_id.as_str(),
                    &data.exam_type.as_str(),
                    &data.status.as_str(),
                    &data.exam_date,
                    &data.weight_kg,
                    &data.height_cm,
                    &data.bmi,
                    &data.snoring_score,
                    &data.desaturation_index,
                    &category_code(data.desaturation_category),
                    &data.spo2_min,
                    &data.spo2_avg,
                    &data.spo2_max,
                    &exam.created_at,
                ],
            )
            .await?;

        tracing::debug!(exam_id = %exam.id, external_exam_id = %data.external_exam_id, "Inserted exam");
        Ok(())
    }

    async fn update_exam(&self, id: ExamId, patient_id: PatientId, data: &ExamData) -> Result<()> {
        let affected = self
            .client
            .execute(
                r#"
                UPDATE exames SET
                    paciente_id = $2, biologix_exam_id = $3, tipo = $4, status = $5,
                    data_exame = $6, peso_kg = $7, altura_cm = $8, imc = $9,
                    score_ronco = $10, ido = $11, ido_categoria = $12,
                    spo2_min = $13, spo2_avg = $14, spo2_max = $15
                WHERE id = $1
                "#,
                &[
                    &id.as_uuid(),
                    &patient_id.as_uuid(),
                    &data.external_exam_id.as_str(),
                    &data.exam_type.as_str(),
                    &data.status.as_str(),
                    &data.exam_date,
                    &data.weight_kg,
                    &data.height_cm,
                    &data.bmi,
                    &data.snoring_score,
                    &data.desaturation_index,
                    &category_code(data.desaturation_category),
                    &data.spo2_min,
                    &data.spo2_avg,
                    &data.spo2_max,
                ],
            )
            .await?;

        if affected == 0 {
            return Err(StoreError::NotFound(format!("exam {id}")).into());
        }
        Ok(())
    }

    async fn patients_with_status(&self, status: PatientStatus) -> Result<Vec<Patient>> {
        let query = format!(
            "SELECT {PATIENT_COLUMNS} FROM pacientes WHERE status = $1 ORDER BY created_at"
        );
        self.client
            .query(&query, &[&status.as_str()])
            .await?
            .iter()
            .map(patient_from_row)
            .collect()
    }

    async fn exams_for_patient(&self, patient_id: PatientId) -> Result<Vec<Exam>> {
        let query = format!(
            "SELECT {EXAM_COLUMNS} FROM exames WHERE paciente_id = $1 \
             ORDER BY data_exame, created_at"
        );
        self.client
            .query(&query, &[&patient_id.as_uuid()])
            .await?
            .iter()
            .map(exam_from_row)
            .collect()
    }

    async fn severe_exams_since(&self, since: NaiveDate) -> Result<Vec<Exam>> {
        let query = format!(
            "SELECT {EXAM_COLUMNS} FROM exames WHERE ido_categoria = $1 AND data_exame >= $2 \
             ORDER BY data_exame, created_at"
        );
        self.client
            .query(&query, &[&DesaturationCategory::Severe.code(), &since])
            .await?
            .iter()
            .map(exam_from_row)
            .collect()
    }
}

#[async_trait]
impl AlertStore for PostgreSQLAdapter {
    async fn exists_pending(
        &self,
        alert_type: AlertType,
        patient_id: PatientId,
        exam_id: Option<ExamId>,
    ) -> Result<bool> {
        let exam_uuid: Option<Uuid> = exam_id.map(|id| id.as_uuid());
        let row = self
            .client
            .query_opt(
                r#"
                SELECT 1 FROM alertas
                WHERE tipo = $1
                  AND paciente_id = $2
                  AND status = 'pending'
                  AND ($3::uuid IS NULL OR exame_id = $3)
                LIMIT 1
                "#,
                &[&alert_type.as_str(), &patient_id.as_uuid(), &exam_uuid],
            )
            .await?;
        Ok(row.is_some())
    }

    async fn create_alert(&self, alert: NewAlert) -> Result<Alert> {
        let alert = alert.into_alert(Utc::now());
        self.client
            .execute(
                r#"
                INSERT INTO alertas (
                    id, tipo, urgencia, titulo, mensagem, paciente_id, exame_id,
                    dados_extras, status, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
                &[
                    &alert.id.as_uuid(),
                    &alert.alert_type.as_str(),
                    &alert.urgency.as_str(),
                    &alert.title,
                    &alert.message,
                    &alert.patient_id.map(|id| id.as_uuid()),
                    &alert.exam_id.map(|id| id.as_uuid()),
                    &alert.extra_data,
                    &alert.status.as_str(),
                    &alert.created_at,
                ],
            )
            .await?;

        tracing::debug!(alert_id = %alert.id, alert_type = %alert.alert_type, "Inserted alert");
        Ok(alert)
    }

    async fn list_alerts(&self, status: Option<AlertStatus>) -> Result<Vec<Alert>> {
        let rows = match status {
            Some(status) => {
                let query = format!(
                    "SELECT {ALERT_COLUMNS} FROM alertas WHERE status = $1 ORDER BY created_at DESC"
                );
                self.client.query(&query, &[&status.as_str()]).await?
            }
            None => {
                let query = format!("SELECT {ALERT_COLUMNS} FROM alertas ORDER BY created_at DESC");
                self.client.query(&query, &[]).await?
            }
        };
        rows.iter().map(alert_from_row).collect()
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

        let query = format!(
            "UPDATE alertas SET status = $2, resolvido_por = $3, resolvido_em = $4 \
             WHERE id = $1 AND status = 'pending' RETURNING {ALERT_COLUMNS}"
        );
        let updated = self
            .client
            .query_opt(
                &query,
                &[&id.as_uuid(), &status.as_str(), &resolved_by, &Utc::now()],
            )
            .await?;
        if let Some(row) = updated {
            return alert_from_row(&row);
        }

        let query = format!("SELECT {ALERT_COLUMNS} FROM alertas WHERE id = $1");
        match self.client.query_opt(&query, &[&id.as_uuid()]).await? {
            Some(row) => Err(already_closed(&alert_from_row(&row)?)),
            None => Err(StoreError::NotFound(format!("alert {id}")).into()),
        }
    }
}
