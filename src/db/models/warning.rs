use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AlertPolicy;

/// Severity of a reading relative to a relation's alert policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningLevel {
    Normal,
    High,
    VeryHigh,
}

impl WarningLevel {
    pub fn classify(sgv: i32, policy: &AlertPolicy) -> Self {
        if sgv >= policy.very_high_value {
            return WarningLevel::VeryHigh;
        }
        if sgv >= policy.high_value {
            return WarningLevel::High;
        }
        WarningLevel::Normal
    }

    pub fn requires_push(&self) -> bool {
        *self != WarningLevel::Normal
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningLevel::Normal => "Normal",
            WarningLevel::High => "High",
            WarningLevel::VeryHigh => "VeryHigh",
        }
    }

    pub fn notification_title(&self) -> &'static str {
        match self {
            WarningLevel::VeryHigh => "Glucose very high alert",
            WarningLevel::High => "Glucose high alert",
            WarningLevel::Normal => "Glucose in normal range",
        }
    }
}

/// One row of the notification ledger: which level a reading was evaluated
/// at for a caregiver. At most one row per (caregiver, reading); written
/// for NORMAL evaluations too, so a reading is never re-evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: i64,
    pub caregiver_id: i64,
    pub reading_id: i64,
    pub warning_level: WarningLevel,
    pub created_at: DateTime<Utc>,
}
