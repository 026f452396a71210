//! Tunable thresholds for the alert rules

use serde::{Deserialize, Serialize};

/// Upper bound for day thresholds, about a century
pub const MAX_THRESHOLD_DAYS: i64 = 36_500;

/// Upper bound for `finalized_followup_months`
pub const MAX_FOLLOWUP_MONTHS: u32 = 1_200;

/// Thresholds consumed by the alert rules
///
/// Maps to the `[alerts.thresholds]` table; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// Days ahead for the "maintenance upcoming" window
    #[serde(default = "default_maintenance_upcoming_days")]
    pub maintenance_upcoming_days: i64,

    /// Days past due after which maintenance is severely overdue
    #[serde(default = "default_maintenance_overdue_days")]
    pub maintenance_overdue_days: i64,

    /// Months after finalization before a follow-up is suggested
    #[serde(default = "default_finalized_followup_months")]
    pub finalized_followup_months: u32,

    /// Days a lead may stay without contact
    #[serde(default = "default_lead_no_contact_days")]
    pub lead_no_contact_days: i64,

    /// Days an active patient may stay without a session
    #[serde(default = "default_active_no_session_days")]
    pub active_no_session_days: i64,

    /// Sessions required before the non-responder rule applies
    #[serde(default = "default_non_responder_min_sessions")]
    pub non_responder_min_sessions: u32,

    /// Exams with a desaturation index required by the non-responder rule
    #[serde(default = "default_non_responder_min_exams")]
    pub non_responder_min_exams: usize,

    /// Improvement percentage below which a patient is a non-responder
    #[serde(default = "default_non_responder_improvement_pct")]
    pub non_responder_improvement_pct: f64,

    /// How far back severe exams raise a critical alert
    #[serde(default = "default_critical_exam_lookback_days")]
    pub critical_exam_lookback_days: i64,
}

impl AlertThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let day_fields = [
            ("maintenance_upcoming_days", self.maintenance_upcoming_days),
            ("maintenance_overdue_days", self.maintenance_overdue_days),
            ("lead_no_contact_days", self.lead_no_contact_days),
            ("active_no_session_days", self.active_no_session_days),
            ("critical_exam_lookback_days", self.critical_exam_lookback_days),
        ];
        for (name, value) in day_fields {
            if !(0..=MAX_THRESHOLD_DAYS).contains(&value) {
                return Err(format!(
                    "alerts.thresholds.{name} must be between 0 and {MAX_THRESHOLD_DAYS}, got {value}"
                ));
            }
        }

        if !(1..=MAX_FOLLOWUP_MONTHS).contains(&self.finalized_followup_months) {
            return Err(format!(
                "alerts.thresholds.finalized_followup_months must be between 1 and {MAX_FOLLOWUP_MONTHS}, got {}",
                self.finalized_followup_months
            ));
        }

        if self.non_responder_min_exams < 2 {
            return Err(format!(
                "alerts.thresholds.non_responder_min_exams must be >= 2, got {}",
                self.non_responder_min_exams
            ));
        }

        if !(0.0..=100.0).contains(&self.non_responder_improvement_pct) {
            return Err(format!(
                "alerts.thresholds.non_responder_improvement_pct must be between 0 and 100, got {}",
                self.non_responder_improvement_pct
            ));
        }

        Ok(())
    }
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            maintenance_upcoming_days: default_maintenance_upcoming_days(),
            maintenance_overdue_days: default_maintenance_overdue_days(),
            finalized_followup_months: default_finalized_followup_months(),
            lead_no_contact_days: default_lead_no_contact_days(),
            active_no_session_days: default_active_no_session_days(),
            non_responder_min_sessions: default_non_responder_min_sessions(),
            non_responder_min_exams: default_non_responder_min_exams(),
            non_responder_improvement_pct: default_non_responder_improvement_pct(),
            critical_exam_lookback_days: default_critical_exam_lookback_days(),
        }
    }
}

fn default_maintenance_upcoming_days() -> i64 {
    7
}

fn default_maintenance_overdue_days() -> i64 {
    30
}

fn default_finalized_followup_months() -> u32 {
    6
}

fn default_lead_no_contact_days() -> i64 {
    3
}

fn default_active_no_session_days() -> i64 {
    7
}

fn default_non_responder_min_sessions() -> u32 {
    5
}

fn default_non_responder_min_exams() -> usize {
    2
}

fn default_non_responder_improvement_pct() -> f64 {
    20.0
}

fn default_critical_exam_lookback_days() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let thresholds = AlertThresholds::default();
        assert!(thresholds.validate().is_ok());
        assert_eq!(thresholds.non_responder_min_sessions, 5);
        assert_eq!(thresholds.finalized_followup_months, 6);
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let thresholds: AlertThresholds = toml::from_str("lead_no_contact_days = 5").unwrap();
        assert_eq!(thresholds.lead_no_contact_days, 5);
        assert_eq!(thresholds.maintenance_upcoming_days, 7);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let thresholds = AlertThresholds {
            non_responder_improvement_pct: 150.0,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());

        let thresholds = AlertThresholds {
            maintenance_overdue_days: -1,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());
    }

    #[test]
    fn test_rejects_day_counts_beyond_chrono_range() {
        let thresholds = AlertThresholds {
            maintenance_upcoming_days: 1_000_000_000_000,
            ..Default::default()
        };
        let err = thresholds.validate().unwrap_err();
        assert!(err.contains("maintenance_upcoming_days"));

        let thresholds = AlertThresholds {
            critical_exam_lookback_days: MAX_THRESHOLD_DAYS,
            finalized_followup_months: MAX_FOLLOWUP_MONTHS,
            ..Default::default()
        };
        assert!(thresholds.validate().is_ok());

        let thresholds = AlertThresholds {
            finalized_followup_months: u32::MAX,
            ..Default::default()
        };
        assert!(thresholds.validate().is_err());
    }
}
