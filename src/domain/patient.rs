//! Patient domain model

use super::ids::{FiscalId, PatientId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Treatment lifecycle of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatientStatus {
    /// Prospect, no paid sessions yet
    Lead,
    /// In treatment
    Active,
    /// Treatment completed
    Finalized,
    /// No longer followed
    Inactive,
}

impl PatientStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Lead => "lead",
            PatientStatus::Active => "active",
            PatientStatus::Finalized => "finalized",
            PatientStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for PatientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lead" => Ok(PatientStatus::Lead),
            "active" => Ok(PatientStatus::Active),
            "finalized" => Ok(PatientStatus::Finalized),
            "inactive" => Ok(PatientStatus::Inactive),
            other => Err(format!("Unknown patient status '{other}'")),
        }
    }
}

/// Patient gender as recorded by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "Other")]
    Other,
}

impl Gender {
    /// Maps the provider's single-letter code. Blank input yields `None`.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "" => None,
            c if c.eq_ignore_ascii_case("m") => Some(Gender::Male),
            c if c.eq_ignore_ascii_case("f") => Some(Gender::Female),
            _ => Some(Gender::Other),
        }
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
            Gender::Other => "Other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" => Ok(Gender::Male),
            "F" => Ok(Gender::Female),
            "Other" => Ok(Gender::Other),
            other => Err(format!("Unknown gender '{other}'")),
        }
    }
}

/// Patient record as stored locally
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub fiscal_id: Option<FiscalId>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub status: PatientStatus,
    /// Treatment sessions consumed so far
    pub sessions_used: u32,
    pub next_maintenance_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Patient fields taken from a raw exam record
///
/// Only used to create a patient the first time a fiscal id is seen.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub fiscal_id: FiscalId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
}

impl NewPatient {
    /// Builds the stored row for a freshly synced patient (always a lead)
    pub fn into_patient(self, now: DateTime<Utc>) -> Patient {
        Patient {
            id: PatientId::new_v4(),
            fiscal_id: Some(self.fiscal_id),
            name: self.name,
            email: self.email,
            phone: self.phone,
            birth_date: self.birth_date,
            gender: self.gender,
            status: PatientStatus::Lead,
            sessions_used: 0,
            next_maintenance_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_code() {
        assert_eq!(Gender::from_code("M"), Some(Gender::Male));
        assert_eq!(Gender::from_code("f"), Some(Gender::Female));
        assert_eq!(Gender::from_code("X"), Some(Gender::Other));
        assert_eq!(Gender::from_code("  "), None);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            PatientStatus::Lead,
            PatientStatus::Active,
            PatientStatus::Finalized,
            PatientStatus::Inactive,
        ] {
            assert_eq!(status.as_str().parse::<PatientStatus>().unwrap(), status);
        }
        assert!("archived".parse::<PatientStatus>().is_err());
    }

    #[test]
    fn test_new_patient_becomes_lead() {
        let now = Utc::now();
        let patient = NewPatient {
            fiscal_id: FiscalId::new("12345678901").unwrap(),
            name: "Ana Souza".to_string(),
            email: None,
            phone: Some("+55 11 99999-0000".to_string()),
            birth_date: None,
            gender: Some(Gender::Female),
        }
        .into_patient(now);

        assert_eq!(patient.status, PatientStatus::Lead);
        assert_eq!(patient.sessions_used, 0);
        assert_eq!(patient.created_at, now);
        assert!(patient.next_maintenance_date.is_none());
    }
}
