//! The fixed alert rule set
//!
//! Each rule queries storage on its own and returns candidates; the engine
//! decides which of them are written. The condition checks are plain
//! functions over one patient (or one exam) so they can be tested without
//! storage.

use super::thresholds::AlertThresholds;
use crate::adapters::database::ClinicStore;
use crate::domain::{
    AlertType, AlertUrgency, DesaturationCategory, Exam, NewAlert, Patient, PatientStatus, Result,
};
use chrono::{Duration, Months, NaiveDate};
use serde_json::json;
use std::fmt;

type PatientCheck = fn(&Patient, &AlertThresholds, NaiveDate) -> Option<NewAlert>;

/// Rules evaluated on every pass, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertRule {
    MaintenanceUpcoming,
    MaintenanceOverdue,
    MaintenanceSeverelyOverdue,
    FinalizedFollowup,
    LeadNoContact,
    ActiveNoSession,
    NonResponder,
    CriticalExam,
}

impl AlertRule {
    pub const ALL: [AlertRule; 8] = [
        AlertRule::MaintenanceUpcoming,
        AlertRule::MaintenanceOverdue,
        AlertRule::MaintenanceSeverelyOverdue,
        AlertRule::FinalizedFollowup,
        AlertRule::LeadNoContact,
        AlertRule::ActiveNoSession,
        AlertRule::NonResponder,
        AlertRule::CriticalExam,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AlertRule::MaintenanceUpcoming => "maintenance_upcoming",
            AlertRule::MaintenanceOverdue => "maintenance_overdue",
            AlertRule::MaintenanceSeverelyOverdue => "maintenance_severely_overdue",
            AlertRule::FinalizedFollowup => "finalized_followup",
            AlertRule::LeadNoContact => "lead_no_contact",
            AlertRule::ActiveNoSession => "active_no_session",
            AlertRule::NonResponder => "non_responder",
            AlertRule::CriticalExam => "critical_exam",
        }
    }

    /// Produce this rule's candidates for `today`
    ///
    /// # Errors
    ///
    /// Returns the storage error of the first failing query.
    pub async fn evaluate(
        &self,
        store: &dyn ClinicStore,
        thresholds: &AlertThresholds,
        today: NaiveDate,
    ) -> Result<Vec<NewAlert>> {
        let per_patient: PatientCheck = match self {
            AlertRule::MaintenanceUpcoming => maintenance_upcoming,
            AlertRule::MaintenanceOverdue => maintenance_overdue,
            AlertRule::MaintenanceSeverelyOverdue => maintenance_severely_overdue,
            AlertRule::FinalizedFollowup => finalized_followup,
            AlertRule::LeadNoContact => lead_no_contact,
            AlertRule::ActiveNoSession => active_no_session,
            AlertRule::NonResponder => return non_responders(store, thresholds).await,
            AlertRule::CriticalExam => return critical_exams(store, thresholds, today).await,
        };

        let status = match self {
            AlertRule::FinalizedFollowup => PatientStatus::Finalized,
            AlertRule::LeadNoContact => PatientStatus::Lead,
            _ => PatientStatus::Active,
        };

        Ok(store
            .patients_with_status(status)
            .await?
            .iter()
            .filter_map(|patient| per_patient(patient, thresholds, today))
            .collect())
    }
}

impl fmt::Display for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `None` when the offset leaves chrono's date range
fn days_before(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|offset| today.checked_sub_signed(offset))
}

fn days_after(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|offset| today.checked_add_signed(offset))
}

fn patient_alert(
    patient: &Patient,
    alert_type: AlertType,
    urgency: AlertUrgency,
    title: &str,
    message: String,
    extra_data: serde_json::Value,
) -> NewAlert {
    NewAlert {
        alert_type,
        urgency,
        title: title.to_string(),
        message,
        patient_id: Some(patient.id),
        exam_id: None,
        extra_data,
    }
}

/// Active patient with maintenance due within the upcoming window
pub fn maintenance_upcoming(
    patient: &Patient,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    let due = active_maintenance_date(patient)?;
    let horizon = days_after(today, thresholds.maintenance_upcoming_days)?;
    if due < today || due > horizon {
        return None;
    }
    let days_until = (due - today).num_days();
    Some(patient_alert(
        patient,
        AlertType::Maintenance,
        AlertUrgency::Medium,
        "Maintenance upcoming",
        format!(
            "{} has maintenance due on {due} (in {days_until} days)",
            patient.name
        ),
        json!({ "next_maintenance_date": due, "days_until": days_until }),
    ))
}

/// Maintenance missed, but by no more than the overdue threshold
pub fn maintenance_overdue(
    patient: &Patient,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    let due = active_maintenance_date(patient)?;
    let limit = days_before(today, thresholds.maintenance_overdue_days)?;
    if due >= today || due < limit {
        return None;
    }
    let days_overdue = (today - due).num_days();
    Some(patient_alert(
        patient,
        AlertType::Maintenance,
        AlertUrgency::High,
        "Maintenance overdue",
        format!(
            "{} missed maintenance due on {due} ({days_overdue} days ago)",
            patient.name
        ),
        json!({ "next_maintenance_date": due, "days_overdue": days_overdue }),
    ))
}

/// Maintenance missed by more than the overdue threshold
pub fn maintenance_severely_overdue(
    patient: &Patient,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    let due = active_maintenance_date(patient)?;
    if due >= days_before(today, thresholds.maintenance_overdue_days)? {
        return None;
    }
    let days_overdue = (today - due).num_days();
    Some(patient_alert(
        patient,
        AlertType::Maintenance,
        AlertUrgency::High,
        "Maintenance severely overdue",
        format!(
            "{} has not had maintenance since {due} ({days_overdue} days overdue)",
            patient.name
        ),
        json!({ "next_maintenance_date": due, "days_overdue": days_overdue }),
    ))
}

fn active_maintenance_date(patient: &Patient) -> Option<NaiveDate> {
    if patient.status != PatientStatus::Active {
        return None;
    }
    patient.next_maintenance_date
}

/// Finalized patient untouched for the follow-up period
pub fn finalized_followup(
    patient: &Patient,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    if patient.status != PatientStatus::Finalized {
        return None;
    }
    let cutoff = today.checked_sub_months(Months::new(thresholds.finalized_followup_months))?;
    let finalized_on = patient.updated_at.date_naive();
    if finalized_on > cutoff {
        return None;
    }
    Some(patient_alert(
        patient,
        AlertType::Followup,
        AlertUrgency::Low,
        "Follow-up after treatment",
        format!(
            "{} finished treatment on {finalized_on}; schedule a follow-up",
            patient.name
        ),
        json!({ "finalized_on": finalized_on }),
    ))
}

/// Lead never contacted within the allowed days
pub fn lead_no_contact(
    patient: &Patient,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    if patient.status != PatientStatus::Lead {
        return None;
    }
    let created_on = patient.created_at.date_naive();
    if created_on > days_before(today, thresholds.lead_no_contact_days)? {
        return None;
    }
    let days_waiting = (today - created_on).num_days();
    Some(patient_alert(
        patient,
        AlertType::Followup,
        AlertUrgency::Medium,
        "Lead without contact",
        format!("{} has been a lead for {days_waiting} days", patient.name),
        json!({ "created_on": created_on, "days_waiting": days_waiting }),
    ))
}

/// Active patient who has not started sessions
pub fn active_no_session(
    patient: &Patient,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    if patient.status != PatientStatus::Active || patient.sessions_used != 0 {
        return None;
    }
    let created_on = patient.created_at.date_naive();
    if created_on > days_before(today, thresholds.active_no_session_days)? {
        return None;
    }
    let days_waiting = (today - created_on).num_days();
    Some(patient_alert(
        patient,
        AlertType::Followup,
        AlertUrgency::Medium,
        "Active patient without sessions",
        format!(
            "{} is active for {days_waiting} days with no session",
            patient.name
        ),
        json!({ "created_on": created_on, "days_waiting": days_waiting }),
    ))
}

/// Active patient whose desaturation index did not improve enough
///
/// `exams` must be ordered by exam date; only exams with an index count.
pub fn non_responder(
    patient: &Patient,
    exams: &[Exam],
    thresholds: &AlertThresholds,
) -> Option<NewAlert> {
    if patient.status != PatientStatus::Active
        || patient.sessions_used < thresholds.non_responder_min_sessions
    {
        return None;
    }

    let indexes: Vec<f64> = exams
        .iter()
        .filter_map(|e| e.data.desaturation_index)
        .collect();
    if indexes.len() < thresholds.non_responder_min_exams {
        return None;
    }

    let first = *indexes.first()?;
    let last = *indexes.last()?;
    if first == 0.0 {
        return None;
    }

    let improvement = (first - last) / first * 100.0;
    if improvement >= thresholds.non_responder_improvement_pct {
        return None;
    }

    let improvement = (improvement * 100.0).round() / 100.0;
    Some(patient_alert(
        patient,
        AlertType::Followup,
        AlertUrgency::Medium,
        "Possible non-responder",
        format!(
            "{} improved {improvement}% (IDO {first} -> {last}) after {} sessions",
            patient.name, patient.sessions_used
        ),
        json!({
            "first_ido": first,
            "last_ido": last,
            "improvement_pct": improvement,
            "sessions_used": patient.sessions_used,
        }),
    ))
}

async fn non_responders(
    store: &dyn ClinicStore,
    thresholds: &AlertThresholds,
) -> Result<Vec<NewAlert>> {
    let mut candidates = Vec::new();
    for patient in store.patients_with_status(PatientStatus::Active).await? {
        if patient.sessions_used < thresholds.non_responder_min_sessions {
            continue;
        }
        let exams = store.exams_for_patient(patient.id).await?;
        candidates.extend(non_responder(&patient, &exams, thresholds));
    }
    Ok(candidates)
}

/// Recent exam with a severe desaturation category
pub fn critical_exam(
    exam: &Exam,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Option<NewAlert> {
    let since = days_before(today, thresholds.critical_exam_lookback_days)?;
    if exam.data.desaturation_category != Some(DesaturationCategory::Severe)
        || exam.data.exam_date < since
    {
        return None;
    }
    Some(NewAlert {
        alert_type: AlertType::Critical,
        urgency: AlertUrgency::High,
        title: "Severe desaturation".to_string(),
        message: format!(
            "Exam {} on {} shows severe desaturation (IDO {})",
            exam.external_exam_id(),
            exam.data.exam_date,
            exam.data
                .desaturation_index
                .map_or_else(|| "n/a".to_string(), |ido| ido.to_string())
        ),
        patient_id: Some(exam.patient_id),
        exam_id: Some(exam.id),
        extra_data: json!({
            "external_exam_id": exam.external_exam_id().as_str(),
            "exam_date": exam.data.exam_date,
            "ido": exam.data.desaturation_index,
        }),
    })
}

async fn critical_exams(
    store: &dyn ClinicStore,
    thresholds: &AlertThresholds,
    today: NaiveDate,
) -> Result<Vec<NewAlert>> {
    let Some(since) = days_before(today, thresholds.critical_exam_lookback_days) else {
        return Ok(Vec::new());
    };
    Ok(store
        .severe_exams_since(since)
        .await?
        .iter()
        .filter_map(|exam| critical_exam(exam, thresholds, today))
        .collect())
}
