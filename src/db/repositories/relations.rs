use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, parse_relation_kind},
    models::{AlertPolicy, CareRelation, RelationKind},
};

fn row_to_relation(row: &Row) -> Result<CareRelation> {
    let relation_kind: String = row.get("relation_kind")?;
    let created_at: String = row.get("created_at")?;

    Ok(CareRelation {
        id: row.get("id")?,
        caregiver_id: row.get("caregiver_id")?,
        patient_id: row.get("patient_id")?,
        relation_kind: parse_relation_kind(&relation_kind)?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Creates a relation and installs its default alert policy in the same
    /// transaction, so a relation is never observable without a policy.
    pub async fn create_care_relation(
        &self,
        caregiver_id: i64,
        patient_id: i64,
        kind: RelationKind,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO care_relations (caregiver_id, patient_id, relation_kind, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![caregiver_id, patient_id, kind.as_str(), now.to_rfc3339()],
            )?;
            let relation_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO alert_policies (relation_id, high_value, very_high_value, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    relation_id,
                    AlertPolicy::DEFAULT_HIGH,
                    AlertPolicy::DEFAULT_VERY_HIGH,
                    now.to_rfc3339(),
                ],
            )?;
            tx.commit()?;
            Ok(relation_id)
        })
        .await
    }

    pub async fn relations_for_patient(&self, patient_id: i64) -> Result<Vec<CareRelation>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, caregiver_id, patient_id, relation_kind, created_at
                 FROM care_relations
                 WHERE patient_id = ?1
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query(params![patient_id])?;
            let mut relations = Vec::new();
            while let Some(row) = rows.next()? {
                relations.push(row_to_relation(row)?);
            }

            Ok(relations)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::db::{models::RelationKind, testing::open_database};

    #[tokio::test]
    async fn creating_a_relation_installs_the_default_policy() {
        let (db, _dir) = open_database();
        let now = Utc::now();
        let patient_id = db.insert_patient("Ada", "http://cgm.local", now).await.unwrap();
        let caregiver_id = db.insert_caregiver("Grace", now).await.unwrap();

        let relation_id = db
            .create_care_relation(caregiver_id, patient_id, RelationKind::Caregiver, now)
            .await
            .unwrap();

        let policy = db.policy_for_relation(relation_id).await.unwrap().unwrap();
        assert_eq!(policy.high_value, 140);
        assert_eq!(policy.very_high_value, 180);

        let relations = db.relations_for_patient(patient_id).await.unwrap();
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].caregiver_id, caregiver_id);
        assert_eq!(relations[0].relation_kind, RelationKind::Caregiver);
    }
}
