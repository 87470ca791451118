use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A caregiver's registered push device token, at most one per caregiver.
/// Deleted when a delivery fails; the client re-registers a fresh one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushToken {
    pub id: i64,
    pub caregiver_id: i64,
    pub token: String,
    pub updated_at: DateTime<Utc>,
}
