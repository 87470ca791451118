use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A monitored patient. `cgm_server_url` is the base URL of the patient's
/// CGM server, queried by the sync job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub cgm_server_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
