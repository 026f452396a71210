//! Operational alert rules
//!
//! - [`rules`] - the fixed rule set and its condition checks
//! - [`dedup`] - suppression of candidates with a pending alert
//! - [`engine`] - one evaluation pass over all rules
//! - [`thresholds`] - configurable windows and limits

pub mod dedup;
pub mod engine;
pub mod rules;
pub mod thresholds;

pub use dedup::AlertDeduplicator;
pub use engine::{AlertRuleEngine, AlertRunSummary};
pub use rules::AlertRule;
pub use thresholds::AlertThresholds;
