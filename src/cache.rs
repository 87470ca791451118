use std::{
    collections::HashMap,
    sync::RwLock,
    time::{Duration, Instant},
};

use crate::db::models::GlucoseReading;

struct CacheEntry {
    stored_at: Instant,
    readings: Vec<GlucoseReading>,
}

/// Per-patient cache of the full reading history, newest first.
///
/// Passive storage only: callers read-through on miss. The TTL is a safety
/// net; explicit invalidation by the sync job is the coherence mechanism.
/// An expired entry counts as absent, so `exists` must be checked before
/// `read` to tell a miss apart from an empty history.
pub struct HistoryCache {
    ttl: Duration,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl HistoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn exists(&self, patient_id: i64) -> bool {
        let entries = self.entries.read().unwrap();
        entries
            .get(&patient_id)
            .is_some_and(|entry| entry.stored_at.elapsed() < self.ttl)
    }

    /// Returns the cached list, or an empty list on miss.
    pub fn read(&self, patient_id: i64) -> Vec<GlucoseReading> {
        let entries = self.entries.read().unwrap();
        match entries.get(&patient_id) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => entry.readings.clone(),
            _ => Vec::new(),
        }
    }

    /// Overwrite semantics: any existing entry is removed before the new
    /// value is stored, so a stale entry can never survive a repopulation.
    pub fn write(&self, patient_id: i64, readings: Vec<GlucoseReading>) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(&patient_id);
        entries.insert(
            patient_id,
            CacheEntry {
                stored_at: Instant::now(),
                readings,
            },
        );
    }

    pub fn invalidate(&self, patient_id: i64) {
        let mut entries = self.entries.write().unwrap();
        entries.remove(&patient_id);
    }
}
