use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::connection::Database;

/// Boundary used when a patient has no watermark yet: 2025-01-01T00:00:00Z,
/// the provider's sync start date.
pub const DEFAULT_SYNC_START_MS: i64 = 1_735_689_600_000;

impl Database {
    pub async fn sync_boundary(&self, patient_id: i64) -> Result<Option<i64>> {
        self.execute(move |conn| {
            let boundary = conn
                .query_row(
                    "SELECT boundary_ms FROM sync_watermarks WHERE patient_id = ?1",
                    params![patient_id],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            Ok(boundary)
        })
        .await
    }

    pub async fn sync_boundary_or_default(&self, patient_id: i64) -> Result<i64> {
        Ok(self
            .sync_boundary(patient_id)
            .await?
            .unwrap_or(DEFAULT_SYNC_START_MS))
    }

    /// Upserts the watermark. Monotonicity is the caller's contract: the
    /// sync job only calls this with a boundary greater than the stored one.
    pub async fn set_sync_boundary(
        &self,
        patient_id: i64,
        boundary_ms: i64,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sync_watermarks (patient_id, boundary_ms, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (patient_id) DO UPDATE SET
                     boundary_ms = excluded.boundary_ms,
                     updated_at = excluded.updated_at",
                params![patient_id, boundary_ms, updated_at.to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::DEFAULT_SYNC_START_MS;
    use crate::db::testing::open_database;

    #[tokio::test]
    async fn missing_watermark_defaults_to_sync_start() {
        let (db, _dir) = open_database();
        let now = Utc::now();
        let patient_id = db.insert_patient("Ada", "http://cgm.local", now).await.unwrap();

        assert_eq!(db.sync_boundary(patient_id).await.unwrap(), None);
        assert_eq!(
            db.sync_boundary_or_default(patient_id).await.unwrap(),
            DEFAULT_SYNC_START_MS
        );
    }

    #[tokio::test]
    async fn set_boundary_upserts_single_row() {
        let (db, _dir) = open_database();
        let now = Utc::now();
        let patient_id = db.insert_patient("Ada", "http://cgm.local", now).await.unwrap();

        db.set_sync_boundary(patient_id, 1_000, now).await.unwrap();
        db.set_sync_boundary(patient_id, 2_000, now).await.unwrap();

        assert_eq!(db.sync_boundary(patient_id).await.unwrap(), Some(2_000));
    }
}
