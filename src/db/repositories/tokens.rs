use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, helpers::parse_datetime, models::PushToken};

impl Database {
    pub async fn push_token_for_caregiver(&self, caregiver_id: i64) -> Result<Option<PushToken>> {
        self.execute(move |conn| {
            let row = conn
                .query_row(
                    "SELECT id, caregiver_id, token, updated_at
                     FROM push_tokens
                     WHERE caregiver_id = ?1",
                    params![caregiver_id],
                    |row| {
                        Ok((
                            row.get::<_, i64>("id")?,
                            row.get::<_, i64>("caregiver_id")?,
                            row.get::<_, String>("token")?,
                            row.get::<_, String>("updated_at")?,
                        ))
                    },
                )
                .optional()?;

            row.map(|(id, caregiver_id, token, updated_at)| {
                Ok(PushToken {
                    id,
                    caregiver_id,
                    token,
                    updated_at: parse_datetime(&updated_at, "updated_at")?,
                })
            })
            .transpose()
        })
        .await
    }

    /// Registers or replaces the caregiver's device token. This is also the
    /// recovery path after a failed delivery deleted the previous token.
    pub async fn register_push_token(
        &self,
        caregiver_id: i64,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let token = token.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO push_tokens (caregiver_id, token, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT (caregiver_id) DO UPDATE SET
                     token = excluded.token,
                     updated_at = excluded.updated_at",
                params![caregiver_id, token, now.to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn delete_push_token(&self, token_id: i64) -> Result<()> {
        self.execute(move |conn| {
            conn.execute("DELETE FROM push_tokens WHERE id = ?1", params![token_id])?;
            Ok(())
        })
        .await
    }
}
