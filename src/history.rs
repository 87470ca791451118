use std::sync::Arc;

use anyhow::Result;

use crate::{cache::HistoryCache, db::models::GlucoseReading, db::Database};

/// Read path for a patient's glucose history: cache hit when present,
/// otherwise the store is read newest-first and the cache is populated.
pub struct HistoryReader {
    db: Database,
    cache: Arc<HistoryCache>,
}

impl HistoryReader {
    pub fn new(db: Database, cache: Arc<HistoryCache>) -> Self {
        Self { db, cache }
    }

    pub async fn readings_for_patient(&self, patient_id: i64) -> Result<Vec<GlucoseReading>> {
        if self.cache.exists(patient_id) {
            return Ok(self.cache.read(patient_id));
        }

        let readings = self.db.readings_for_patient(patient_id).await?;
        self.cache.write(patient_id, readings.clone());
        Ok(readings)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use chrono::Utc;

    use super::HistoryReader;
    use crate::{cache::HistoryCache, db::testing::open_database};

    #[tokio::test]
    async fn miss_populates_cache_from_store() {
        let (db, _dir) = open_database();
        let now = Utc::now();
        let patient_id = db.insert_patient("Ada", "http://cgm.local", now).await.unwrap();
        db.insert_reading_if_absent(patient_id, 120, 1_000, now)
            .await
            .unwrap();

        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let reader = HistoryReader::new(db, cache.clone());

        let readings = reader.readings_for_patient(patient_id).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert!(cache.exists(patient_id));
    }

    #[tokio::test]
    async fn invalidated_entry_is_rebuilt_with_new_rows() {
        let (db, _dir) = open_database();
        let now = Utc::now();
        let patient_id = db.insert_patient("Ada", "http://cgm.local", now).await.unwrap();
        db.insert_reading_if_absent(patient_id, 120, 1_000, now)
            .await
            .unwrap();

        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let reader = HistoryReader::new(db.clone(), cache.clone());
        reader.readings_for_patient(patient_id).await.unwrap();

        db.insert_reading_if_absent(patient_id, 150, 2_000, now)
            .await
            .unwrap();
        cache.invalidate(patient_id);

        let readings = reader.readings_for_patient(patient_id).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].recorded_at_ms, 2_000);
    }
}
