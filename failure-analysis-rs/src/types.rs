// failure-analysis-rs/src/types.rs
// Request and response bodies for the analysis endpoint

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Labels every recovery plan must carry, in iteration order.
pub const RECOVERY_DAYS: [&str; 7] = [
    "Day 1", "Day 2", "Day 3", "Day 4", "Day 5", "Day 6", "Day 7",
];

pub const DEFAULT_EFFORT: u8 = 5;
pub const DEFAULT_PREPARATION_HOURS: u64 = 0;
pub const DEFAULT_CONFIDENCE: u8 = 5;

/// Analyze request body (JSON)
///
/// Range checks live in the request schema in `validation.rs`; by the time a
/// report is deserialized the bounds already hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub description: String,
    #[serde(default, deserialize_with = "whole_number")]
    pub effort_level: Option<u8>,
    #[serde(default, deserialize_with = "whole_number")]
    pub preparation_hours: Option<u64>,
    #[serde(default, deserialize_with = "whole_number")]
    pub confidence_before: Option<u8>,
}

impl FailureReport {
    pub fn effort_or_default(&self) -> u8 {
        self.effort_level.unwrap_or(DEFAULT_EFFORT)
    }

    pub fn preparation_hours_or_default(&self) -> u64 {
        self.preparation_hours.unwrap_or(DEFAULT_PREPARATION_HOURS)
    }

    pub fn confidence_or_default(&self) -> u8 {
        self.confidence_before.unwrap_or(DEFAULT_CONFIDENCE)
    }
}

/// Accept integers and integral floats (`3.0`), since the schema's
/// `"integer"` type admits both.
fn whole_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };

    let whole = number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    });

    whole
        .and_then(|n| T::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| de::Error::custom(format!("expected a non-negative whole number in range, got {}", number)))
}

/// Structured diagnosis returned by both the live and the demo path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureAnalysis {
    pub primary_root_cause: String,
    pub secondary_causes: Vec<String>,
    pub repeated_behavior_pattern: String,
    pub false_beliefs_or_assumptions: Vec<String>,
    pub harsh_truth: String,
    pub corrective_actions: Vec<String>,
    /// Keyed "Day 1".."Day 7"; lexical key order matches day order.
    pub seven_day_recovery_plan: BTreeMap<String, String>,
    pub long_term_warning: String,
}

impl FailureAnalysis {
    /// Check the recovery plan has exactly the seven day labels.
    pub fn check_recovery_plan(&self) -> Result<(), String> {
        let keys: Vec<&str> = self
            .seven_day_recovery_plan
            .keys()
            .map(String::as_str)
            .collect();

        if keys == RECOVERY_DAYS {
            Ok(())
        } else {
            Err(format!(
                "seven_day_recovery_plan must have exactly the keys {:?}, got {:?}",
                RECOVERY_DAYS, keys
            ))
        }
    }
}
