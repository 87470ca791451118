use serde::{Deserialize, Serialize};

/// A single glucose measurement. `recorded_at_ms` is epoch milliseconds as
/// reported by the provider; (patient_id, recorded_at_ms) is unique in the
/// store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlucoseReading {
    pub id: i64,
    pub patient_id: i64,
    pub sgv: i32,
    pub recorded_at_ms: i64,
}
