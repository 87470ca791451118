use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::connection::Database;

impl Database {
    pub async fn insert_caregiver(&self, name: &str, now: DateTime<Utc>) -> Result<i64> {
        let name = name.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO caregivers (name, created_at) VALUES (?1, ?2)",
                params![name, now.to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }
}
