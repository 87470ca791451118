use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::{connection::Database, models::GlucoseReading};

fn row_to_reading(row: &Row) -> Result<GlucoseReading> {
    Ok(GlucoseReading {
        id: row.get("id")?,
        patient_id: row.get("patient_id")?,
        sgv: row.get("sgv")?,
        recorded_at_ms: row.get("recorded_at_ms")?,
    })
}

impl Database {
    /// Inserts a reading unless one already exists at the same
    /// (patient, timestamp). The UNIQUE constraint is the authoritative
    /// dedup guard; a constraint hit is a no-op, reported as `false`.
    pub async fn insert_reading_if_absent(
        &self,
        patient_id: i64,
        sgv: i32,
        recorded_at_ms: i64,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        self.execute(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO glucose_readings
                     (patient_id, sgv, recorded_at_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![patient_id, sgv, recorded_at_ms, now.to_rfc3339()],
            )?;
            Ok(inserted > 0)
        })
        .await
    }

    pub async fn latest_reading(&self, patient_id: i64) -> Result<Option<GlucoseReading>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, sgv, recorded_at_ms
                 FROM glucose_readings
                 WHERE patient_id = ?1
                 ORDER BY recorded_at_ms DESC
                 LIMIT 1",
            )?;

            let row = stmt
                .query_row(params![patient_id], |row| {
                    Ok((
                        row.get::<_, i64>("id")?,
                        row.get::<_, i64>("patient_id")?,
                        row.get::<_, i32>("sgv")?,
                        row.get::<_, i64>("recorded_at_ms")?,
                    ))
                })
                .optional()?;

            Ok(row.map(|(id, patient_id, sgv, recorded_at_ms)| GlucoseReading {
                id,
                patient_id,
                sgv,
                recorded_at_ms,
            }))
        })
        .await
    }

    /// Timestamps already stored for the patient strictly after `boundary_ms`.
    /// The sync job uses this set to skip writes it knows would conflict.
    pub async fn reading_timestamps_after(
        &self,
        patient_id: i64,
        boundary_ms: i64,
    ) -> Result<HashSet<i64>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT recorded_at_ms
                 FROM glucose_readings
                 WHERE patient_id = ?1 AND recorded_at_ms > ?2",
            )?;

            let mut rows = stmt.query(params![patient_id, boundary_ms])?;
            let mut timestamps = HashSet::new();
            while let Some(row) = rows.next()? {
                timestamps.insert(row.get::<_, i64>(0)?);
            }

            Ok(timestamps)
        })
        .await
    }

    pub async fn readings_for_patient(&self, patient_id: i64) -> Result<Vec<GlucoseReading>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, patient_id, sgv, recorded_at_ms
                 FROM glucose_readings
                 WHERE patient_id = ?1
                 ORDER BY recorded_at_ms DESC",
            )?;

            let mut rows = stmt.query(params![patient_id])?;
            let mut readings = Vec::new();
            while let Some(row) = rows.next()? {
                readings.push(row_to_reading(row)?);
            }

            Ok(readings)
        })
        .await
    }
}
