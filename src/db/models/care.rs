use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    Caregiver,
    Family,
    Medical,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Caregiver => "Caregiver",
            RelationKind::Family => "Family",
            RelationKind::Medical => "Medical",
        }
    }
}

/// Links a caregiver to the patient they observe. Owned by the relation
/// management subsystem; the alert job only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareRelation {
    pub id: i64,
    pub caregiver_id: i64,
    pub patient_id: i64,
    pub relation_kind: RelationKind,
    pub created_at: DateTime<Utc>,
}

/// Per-relation alert thresholds, 1:1 with CareRelation. Invariant
/// high_value <= very_high_value, enforced on update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPolicy {
    pub id: i64,
    pub relation_id: i64,
    pub high_value: i32,
    pub very_high_value: i32,
}

impl AlertPolicy {
    pub const DEFAULT_HIGH: i32 = 140;
    pub const DEFAULT_VERY_HIGH: i32 = 180;
}
