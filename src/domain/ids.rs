//! Domain identifier types with validation
//!
//! Newtype wrappers keep fiscal ids, provider exam ids and local row ids from
//! being mixed up.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Number of digits in a fiscal id (CPF)
pub const FISCAL_ID_LEN: usize = 11;

/// National taxpayer identifier used to deduplicate patients
///
/// Always exactly eleven ASCII digits.
///
/// # Examples
///
/// ```
/// use examsync::domain::ids::FiscalId;
///
/// let id = FiscalId::new("12345678901").unwrap();
/// assert_eq!(id.as_str(), "12345678901");
/// assert!(FiscalId::new("123").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiscalId(String);

impl FiscalId {
    /// Creates a new FiscalId, rejecting anything but eleven digits
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.len() != FISCAL_ID_LEN || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!(
                "Fiscal id must have exactly {FISCAL_ID_LEN} digits, got '{id}'"
            ));
        }
        Ok(Self(id))
    }

    /// Returns the fiscal id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Masked form for logs, keeping only the last two digits
    pub fn masked(&self) -> String {
        format!("*********{}", &self.0[FISCAL_ID_LEN - 2..])
    }
}

impl fmt::Display for FiscalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FiscalId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// Exam identifier assigned by the provider
///
/// Unique across all exams; the upsert key for local exam rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalExamId(String);

impl ExternalExamId {
    /// Creates a new ExternalExamId from a non-blank string
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("External exam id cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the exam id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalExamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExternalExamId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a fresh random id
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| format!("Invalid {}: {e}", stringify!($name)))
            }
        }
    };
}

uuid_id!(
    /// Local patient row id
    PatientId
);
uuid_id!(
    /// Local exam row id
    ExamId
);
uuid_id!(
    /// Local alert row id
    AlertId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fiscal_id_valid() {
        let id = FiscalId::new("12345678901").unwrap();
        assert_eq!(id.as_str(), "12345678901");
        assert_eq!(id.to_string(), "12345678901");
    }

    #[test]
    fn test_fiscal_id_rejects_wrong_length_and_letters() {
        assert!(FiscalId::new("1234567890").is_err());
        assert!(FiscalId::new("123456789012").is_err());
        assert!(FiscalId::new("1234567890a").is_err());
        assert!(FiscalId::new("").is_err());
    }

    #[test]
    fn test_fiscal_id_masked() {
        let id = FiscalId::new("12345678901").unwrap();
        assert_eq!(id.masked(), "*********01");
    }

    #[test]
    fn test_external_exam_id_trims() {
        let id = ExternalExamId::new("  EX-1 ").unwrap();
        assert_eq!(id.as_str(), "EX-1");
        assert!(ExternalExamId::new("   ").is_err());
    }

    #[test]
    fn test_uuid_ids_round_trip_through_str() {
        let id = PatientId::new_v4();
        let parsed = PatientId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(ExamId::from_str("not-a-uuid").is_err());
    }
}
