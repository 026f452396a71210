//! Operational alert model

use super::ids::{AlertId, ExamId, PatientId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Critical,
    Maintenance,
    Followup,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Critical => "critical",
            AlertType::Maintenance => "maintenance",
            AlertType::Followup => "followup",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(AlertType::Critical),
            "maintenance" => Ok(AlertType::Maintenance),
            "followup" => Ok(AlertType::Followup),
            other => Err(format!("Unknown alert type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertUrgency {
    High,
    Medium,
    Low,
}

impl AlertUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertUrgency::High => "high",
            AlertUrgency::Medium => "medium",
            AlertUrgency::Low => "low",
        }
    }
}

impl FromStr for AlertUrgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(AlertUrgency::High),
            "medium" => Ok(AlertUrgency::Medium),
            "low" => Ok(AlertUrgency::Low),
            other => Err(format!("Unknown alert urgency '{other}'")),
        }
    }
}

/// Alert lifecycle: pending until an operator resolves or ignores it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Resolved,
    Ignored,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Ignored => "ignored",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AlertStatus::Pending),
            "resolved" => Ok(AlertStatus::Resolved),
            "ignored" => Ok(AlertStatus::Ignored),
            other => Err(format!("Unknown alert status '{other}'")),
        }
    }
}

/// Alert candidate produced by a rule, not yet persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub alert_type: AlertType,
    pub urgency: AlertUrgency,
    pub title: String,
    pub message: String,
    pub patient_id: Option<PatientId>,
    pub exam_id: Option<ExamId>,
    pub extra_data: serde_json::Value,
}

impl NewAlert {
    /// Materializes the candidate as a pending alert
    pub fn into_alert(self, now: DateTime<Utc>) -> Alert {
        Alert {
            id: AlertId::new_v4(),
            alert_type: self.alert_type,
            urgency: self.urgency,
            title: self.title,
            message: self.message,
            patient_id: self.patient_id,
            exam_id: self.exam_id,
            extra_data: self.extra_data,
            status: AlertStatus::Pending,
            created_at: now,
            resolved_by: None,
            resolved_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub urgency: AlertUrgency,
    pub title: String,
    pub message: String,
    pub patient_id: Option<PatientId>,
    pub exam_id: Option<ExamId>,
    pub extra_data: serde_json::Value,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}
