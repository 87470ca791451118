use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{connection::Database, models::AlertPolicy};

impl Database {
    pub async fn policy_for_relation(&self, relation_id: i64) -> Result<Option<AlertPolicy>> {
        self.execute(move |conn| {
            let policy = conn
                .query_row(
                    "SELECT id, relation_id, high_value, very_high_value
                     FROM alert_policies
                     WHERE relation_id = ?1",
                    params![relation_id],
                    |row| {
                        Ok(AlertPolicy {
                            id: row.get("id")?,
                            relation_id: row.get("relation_id")?,
                            high_value: row.get("high_value")?,
                            very_high_value: row.get("very_high_value")?,
                        })
                    },
                )
                .optional()?;
            Ok(policy)
        })
        .await
    }

    pub async fn update_policy_high(
        &self,
        relation_id: i64,
        high_value: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            let very_high: i32 = conn
                .query_row(
                    "SELECT very_high_value FROM alert_policies WHERE relation_id = ?1",
                    params![relation_id],
                    |row| row.get(0),
                )
                .context("alert policy not found for relation")?;
            if high_value > very_high {
                bail!("high threshold {high_value} exceeds very-high threshold {very_high}");
            }
            conn.execute(
                "UPDATE alert_policies
                 SET high_value = ?1, updated_at = ?2
                 WHERE relation_id = ?3",
                params![high_value, updated_at.to_rfc3339(), relation_id],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn update_policy_very_high(
        &self,
        relation_id: i64,
        very_high_value: i32,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        self.execute(move |conn| {
            let high: i32 = conn
                .query_row(
                    "SELECT high_value FROM alert_policies WHERE relation_id = ?1",
                    params![relation_id],
                    |row| row.get(0),
                )
                .context("alert policy not found for relation")?;
            if very_high_value < high {
                bail!("very-high threshold {very_high_value} is below high threshold {high}");
            }
            conn.execute(
                "UPDATE alert_policies
                 SET very_high_value = ?1, updated_at = ?2
                 WHERE relation_id = ?3",
                params![very_high_value, updated_at.to_rfc3339(), relation_id],
            )?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::{models::RelationKind, testing::open_database};

    #[tokio::test]
    async fn threshold_updates_keep_high_below_very_high() {
        let (db, _dir) = open_database();
        let now = Utc::now();
        let patient_id = db.insert_patient("Ada", "http://cgm.local", now).await.unwrap();
        let caregiver_id = db.insert_caregiver("Grace", now).await.unwrap();
        let relation_id = db
            .create_care_relation(caregiver_id, patient_id, RelationKind::Caregiver, now)
            .await
            .unwrap();

        db.update_policy_high(relation_id, 150, now).await.unwrap();
        assert!(db.update_policy_high(relation_id, 200, now).await.is_err());
        assert!(db
            .update_policy_very_high(relation_id, 120, now)
            .await
            .is_err());
        db.update_policy_very_high(relation_id, 220, now).await.unwrap();

        let policy = db.policy_for_relation(relation_id).await.unwrap().unwrap();
        assert_eq!(policy.high_value, 150);
        assert_eq!(policy.very_high_value, 220);
    }
}
