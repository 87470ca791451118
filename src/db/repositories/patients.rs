use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{connection::Database, helpers::parse_datetime, models::Patient};

fn row_to_patient(row: &Row) -> Result<Patient> {
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Patient {
        id: row.get("id")?,
        name: row.get("name")?,
        cgm_server_url: row.get("cgm_server_url")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_patient(
        &self,
        name: &str,
        cgm_server_url: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let name = name.to_string();
        let cgm_server_url = cgm_server_url.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO patients (name, cgm_server_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, cgm_server_url, now.to_rfc3339(), now.to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    pub async fn all_patients(&self) -> Result<Vec<Patient>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, cgm_server_url, created_at, updated_at
                 FROM patients
                 ORDER BY id ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut patients = Vec::new();
            while let Some(row) = rows.next()? {
                patients.push(row_to_patient(row)?);
            }

            Ok(patients)
        })
        .await
    }
}
