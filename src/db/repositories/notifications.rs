use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_warning_level},
    models::{NotificationRecord, WarningLevel},
};

impl Database {
    pub async fn notification_exists(&self, caregiver_id: i64, reading_id: i64) -> Result<bool> {
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM warning_notifications
                 WHERE caregiver_id = ?1 AND reading_id = ?2",
                params![caregiver_id, reading_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
    }

    /// Appends to the dedup ledger. `INSERT OR IGNORE` keeps the append
    /// at-most-once even if two evaluations race on the same pair.
    pub async fn insert_notification_record(
        &self,
        caregiver_id: i64,
        reading_id: i64,
        level: WarningLevel,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO warning_notifications
                     (caregiver_id, reading_id, warning_level, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![caregiver_id, reading_id, level.as_str(), now.to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn notification_record(
        &self,
        caregiver_id: i64,
        reading_id: i64,
    ) -> Result<Option<NotificationRecord>> {
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, caregiver_id, reading_id, warning_level, created_at
                     FROM warning_notifications
                     WHERE caregiver_id = ?1 AND reading_id = ?2",
                    params![caregiver_id, reading_id],
                    |row| {
                        Ok((
                            row.get::<_, i64>("id")?,
                            row.get::<_, i64>("caregiver_id")?,
                            row.get::<_, i64>("reading_id")?,
                            row.get::<_, String>("warning_level")?,
                            row.get::<_, String>("created_at")?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(id, caregiver_id, reading_id, warning_level, created_at)| {
                Ok(NotificationRecord {
                    id,
                    caregiver_id,
                    reading_id,
                    warning_level: parse_warning_level(&warning_level)?,
                    created_at: parse_datetime(&created_at, "created_at")?,
                })
            })
            .transpose()
        })
        .await
    }

    pub async fn notification_count(&self, caregiver_id: i64, reading_id: i64) -> Result<i64> {
        self.execute(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM warning_notifications
                 WHERE caregiver_id = ?1 AND reading_id = ?2",
                params![caregiver_id, reading_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
    }
}
