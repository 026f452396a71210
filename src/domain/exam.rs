//! Exam domain model and provider code tables

use super::ids::{ExamId, ExternalExamId, PatientId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of exam performed by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Snoring,
    Sleep,
}

impl ExamType {
    /// Translates the provider's numeric code
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ExamType::Snoring),
            1 => Some(ExamType::Sleep),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Snoring => "snoring",
            ExamType::Sleep => "sleep",
        }
    }
}

impl FromStr for ExamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "snoring" => Ok(ExamType::Snoring),
            "sleep" => Ok(ExamType::Sleep),
            other => Err(format!("Unknown exam type '{other}'")),
        }
    }
}

/// Exam status as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamStatus {
    Issued,
    Scheduled,
    Recording,
    Uploaded,
    Analyzing,
    Error,
    Done,
    Cancelled,
}

impl ExamStatus {
    /// Provider code for a finished exam with results
    pub const COMPLETED_CODE: i64 = 6;

    /// Translates the provider's numeric code
    pub fn from_code(code: i64) -> Option<Self> {
        let status = match code {
            0 => ExamStatus::Issued,
            1 => ExamStatus::Scheduled,
            2 => ExamStatus::Recording,
            3 => ExamStatus::Uploaded,
            4 => ExamStatus::Analyzing,
            5 => ExamStatus::Error,
            6 => ExamStatus::Done,
            7 => ExamStatus::Cancelled,
            _ => return None,
        };
        Some(status)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Issued => "issued",
            ExamStatus::Scheduled => "scheduled",
            ExamStatus::Recording => "recording",
            ExamStatus::Uploaded => "uploaded",
            ExamStatus::Analyzing => "analyzing",
            ExamStatus::Error => "error",
            ExamStatus::Done => "done",
            ExamStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(ExamStatus::Issued),
            "scheduled" => Ok(ExamStatus::Scheduled),
            "recording" => Ok(ExamStatus::Recording),
            "uploaded" => Ok(ExamStatus::Uploaded),
            "analyzing" => Ok(ExamStatus::Analyzing),
            "error" => Ok(ExamStatus::Error),
            "done" => Ok(ExamStatus::Done),
            "cancelled" => Ok(ExamStatus::Cancelled),
            other => Err(format!("Unknown exam status '{other}'")),
        }
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Oxygen desaturation severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesaturationCategory {
    Normal,
    Mild,
    Moderate,
    Severe,
}

impl DesaturationCategory {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(DesaturationCategory::Normal),
            1 => Some(DesaturationCategory::Mild),
            2 => Some(DesaturationCategory::Moderate),
            3 => Some(DesaturationCategory::Severe),
            _ => None,
        }
    }

    /// Code stored in the `ido_categoria` column
    pub fn code(&self) -> i16 {
        match self {
            DesaturationCategory::Normal => 0,
            DesaturationCategory::Mild => 1,
            DesaturationCategory::Moderate => 2,
            DesaturationCategory::Severe => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DesaturationCategory::Normal => "normal",
            DesaturationCategory::Mild => "mild",
            DesaturationCategory::Moderate => "moderate",
            DesaturationCategory::Severe => "severe",
        }
    }
}

/// Mutable exam fields produced by the mapper
///
/// Written as a whole on insert and on update (full overwrite).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamData {
    pub external_exam_id: ExternalExamId,
    pub exam_type: ExamType,
    pub status: ExamStatus,
    pub exam_date: NaiveDate,
    pub weight_kg: Option<f64>,
    pub height_cm: Option<f64>,
    pub bmi: Option<f64>,
    pub snoring_score: Option<f64>,
    /// Oxygen desaturation index (IDO/ODI), events per hour
    pub desaturation_index: Option<f64>,
    pub desaturation_category: Option<DesaturationCategory>,
    pub spo2_min: Option<f64>,
    pub spo2_avg: Option<f64>,
    pub spo2_max: Option<f64>,
}

/// Stored exam row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exam {
    pub id: ExamId,
    pub patient_id: PatientId,
    #[serde(flatten)]
    pub data: ExamData,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    pub fn external_exam_id(&self) -> &ExternalExamId {
        &self.data.external_exam_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ExamStatus::from_code(0), Some(ExamStatus::Issued));
        assert_eq!(
            ExamStatus::from_code(ExamStatus::COMPLETED_CODE),
            Some(ExamStatus::Done)
        );
        assert_eq!(ExamStatus::from_code(7), Some(ExamStatus::Cancelled));
        assert_eq!(ExamStatus::from_code(8), None);
        assert_eq!(ExamStatus::from_code(-1), None);
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(ExamType::from_code(0), Some(ExamType::Snoring));
        assert_eq!(ExamType::from_code(1), Some(ExamType::Sleep));
        assert_eq!(ExamType::from_code(2), None);
    }

    #[test]
    fn test_desaturation_category_code_round_trip() {
        for code in 0..=3 {
            let category = DesaturationCategory::from_code(code).unwrap();
            assert_eq!(i64::from(category.code()), code);
        }
        assert_eq!(DesaturationCategory::from_code(4), None);
        assert!(DesaturationCategory::Severe > DesaturationCategory::Moderate);
    }

    #[test]
    fn test_status_parses_storage_value() {
        assert_eq!("done".parse::<ExamStatus>().unwrap(), ExamStatus::Done);
        assert!("finished".parse::<ExamStatus>().is_err());
    }
}
