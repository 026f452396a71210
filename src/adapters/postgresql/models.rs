//! PostgreSQL row models
//!
//! Column lists and row-to-domain conversion for the `pacientes`, `exames`
//! and `alertas` tables. Enum columns hold the lowercase domain names; the
//! desaturation category is stored as its provider code.

use crate::domain::{
    Alert, AlertStatus, AlertType, AlertUrgency, DesaturationCategory, Exam, ExamData, ExamStatus,
    ExamType, ExternalExamId, FiscalId, Gender, Patient, PatientStatus, Result, StoreError,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;
use tokio_postgres::types::FromSql;
use tokio_postgres::Row;
use uuid::Uuid;

pub const PATIENT_COLUMNS: &str = "id, fiscal_id, nome, email, telefone, data_nascimento, \
     genero, status, sessoes_utilizadas, proxima_manutencao, created_at, updated_at";

pub const EXAM_COLUMNS: &str = "id, paciente_id, biologix_exam_id, tipo, status, data_exame, \
     peso_kg, altura_cm, imc, score_ronco, ido, ido_categoria, spo2_min, spo2_avg, spo2_max, \
     created_at";

pub const ALERT_COLUMNS: &str = "id, tipo, urgencia, titulo, mensagem, paciente_id, exame_id, \
     dados_extras, status, created_at, resolvido_por, resolvido_em";

fn column<'a, T: FromSql<'a>>(row: &'a Row, name: &str) -> Result<T> {
    row.try_get(name)
        .map_err(|e| StoreError::InvalidRow(format!("column {name}: {e}")).into())
}

fn parsed<T>(row: &Row, name: &str) -> Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = column(row, name)?;
    T::from_str(&raw).map_err(|e| StoreError::InvalidRow(format!("column {name}: {e}")).into())
}

pub fn patient_from_row(row: &Row) -> Result<Patient> {
    let id: Uuid = column(row, "id")?;
    let fiscal_id = column::<Option<String>>(row, "fiscal_id")?
        .map(FiscalId::new)
        .transpose()
        .map_err(|e| StoreError::InvalidRow(format!("column fiscal_id: {e}")))?;
    let gender = column::<Option<String>>(row, "genero")?
        .map(|g| Gender::from_str(&g))
        .transpose()
        .map_err(|e| StoreError::InvalidRow(format!("column genero: {e}")))?;
    let sessions: i32 = column(row, "sessoes_utilizadas")?;

    Ok(Patient {
        id: id.into(),
        fiscal_id,
        name: column(row, "nome")?,
        email: column(row, "email")?,
        phone: column(row, "telefone")?,
        birth_date: column::<Option<NaiveDate>>(row, "data_nascimento")?,
        gender,
        status: parsed::<PatientStatus>(row, "status")?,
        sessions_used: u32::try_from(sessions).map_err(|_| {
            StoreError::InvalidRow(format!("column sessoes_utilizadas: negative value {sessions}"))
        })?,
        next_maintenance_date: column(row, "proxima_manutencao")?,
        created_at: column::<DateTime<Utc>>(row, "created_at")?,
        updated_at: column::<DateTime<Utc>>(row, "updated_at")?,
    })
}

pub fn exam_from_row(row: &Row) -> Result<Exam> {
    let id: Uuid = column(row, "id")?;
    let patient_id: Uuid = column(row, "paciente_id")?;
    let external: String = column(row, "biologix_exam_id")?;
    let category = column::<Option<i16>>(row, "ido_categoria")?
        .map(|code| {
            DesaturationCategory::from_code(i64::from(code)).ok_or_else(|| {
                StoreError::InvalidRow(format!("column ido_categoria: unknown code {code}"))
            })
        })
        .transpose()?;

    Ok(Exam {
        id: id.into(),
        patient_id: patient_id.into(),
        data: ExamData {
            external_exam_id: ExternalExamId::new(external)
                .map_err(|e| StoreError::InvalidRow(format!("column biologix_exam_id: {e}")))?,
            exam_type: parsed::<ExamType>(row, "tipo")?,
            status: parsed::<ExamStatus>(row, "status")?,
            exam_date: column(row, "data_exame")?,
            weight_kg: column(row, "peso_kg")?,
            height_cm: column(row, "altura_cm")?,
            bmi: column(row, "imc")?,
            snoring_score: column(row, "score_ronco")?,
            desaturation_index: column(row, "ido")?,
            desaturation_category: category,
            spo2_min: column(row, "spo2_min")?,
            spo2_avg: column(row, "spo2_avg")?,
            spo2_max: column(row, "spo2_max")?,
        },
        created_at: column(row, "created_at")?,
    })
}

pub fn alert_from_row(row: &Row) -> Result<Alert> {
    let id: Uuid = column(row, "id")?;
    let patient_id: Option<Uuid> = column(row, "paciente_id")?;
    let exam_id: Option<Uuid> = column(row, "exame_id")?;

    Ok(Alert {
        id: id.into(),
        alert_type: parsed::<AlertType>(row, "tipo")?,
        urgency: parsed::<AlertUrgency>(row, "urgencia")?,
        title: column(row, "titulo")?,
        message: column(row, "mensagem")?,
        patient_id: patient_id.map(Into::into),
        exam_id: exam_id.map(Into::into),
        extra_data: column(row, "dados_extras")?,
        status: parsed::<AlertStatus>(row, "status")?,
        created_at: column(row, "created_at")?,
        resolved_by: column(row, "resolvido_por")?,
        resolved_at: column(row, "resolvido_em")?,
    })
}

/// Category code as stored in `ido_categoria`
pub fn category_code(category: Option<DesaturationCategory>) -> Option<i16> {
    category.map(|c| c.code())
}
