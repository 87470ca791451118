use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, NaiveTime, Utc};
use tokio::time::{timeout, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    cache::HistoryCache,
    clients::{CgmFetch, FetchError},
    db::{models::Patient, Database},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const SYNC_PATIENT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default)]
struct SyncReport {
    fetched: usize,
    inserted: usize,
}

/// Pulls provider readings for every patient, storing each reading exactly
/// once and advancing the per-patient watermark.
pub struct SyncJob<F: CgmFetch> {
    db: Database,
    cache: Arc<HistoryCache>,
    fetcher: F,
}

impl<F: CgmFetch> SyncJob<F> {
    pub fn new(db: Database, cache: Arc<HistoryCache>, fetcher: F) -> Self {
        Self { db, cache, fetcher }
    }

    /// One sync pass over all patients. A failure in one patient's unit is
    /// logged and skipped; that patient retries on the next tick with an
    /// unchanged watermark. Stops scheduling further patients once
    /// cancellation is requested.
    pub async fn run_tick(&self, now: DateTime<Utc>, cancel: &CancellationToken) {
        let patients = match self.db.all_patients().await {
            Ok(patients) => patients,
            Err(err) => {
                log_error!("failed to list patients for sync tick: {err:#}");
                return;
            }
        };

        for patient in patients {
            if cancel.is_cancelled() {
                log_info!("sync tick interrupted by shutdown");
                break;
            }

            let unit = timeout(
                Duration::from_secs(SYNC_PATIENT_TIMEOUT_SECS),
                self.sync_patient(&patient, now),
            );
            match unit.await {
                Ok(Ok(report)) => {
                    if report.inserted > 0 {
                        log_info!(
                            "synced patient {}: {} fetched, {} stored",
                            patient.id,
                            report.fetched,
                            report.inserted
                        );
                    }
                }
                Ok(Err(err)) => {
                    log_error!("sync failed for patient {}: {err:#}", patient.id);
                }
                Err(_) => {
                    log_warn!(
                        "sync timeout (> {}s) for patient {}",
                        SYNC_PATIENT_TIMEOUT_SECS,
                        patient.id
                    );
                }
            }
        }
    }

    async fn sync_patient(&self, patient: &Patient, now: DateTime<Utc>) -> Result<SyncReport> {
        let boundary = self.db.sync_boundary_or_default(patient.id).await?;

        let entries = match self
            .fetcher
            .fetch_entries(&patient.cgm_server_url, boundary)
            .await
        {
            Ok(entries) => entries,
            Err(FetchError::Transport(err)) => {
                log_warn!("cgm fetch failed for patient {}: {err:#}", patient.id);
                return Ok(SyncReport::default());
            }
            Err(FetchError::Malformed(err)) => {
                log_error!("cgm response malformed for patient {}: {err}", patient.id);
                return Ok(SyncReport::default());
            }
        };

        // Timestamps already stored past the boundary; skips writes that
        // would hit the unique constraint. The constraint itself still
        // backstops anything this set misses.
        let known = self
            .db
            .reading_timestamps_after(patient.id, boundary)
            .await?;

        let mut report = SyncReport {
            fetched: entries.len(),
            inserted: 0,
        };
        for entry in &entries {
            if known.contains(&entry.date) {
                continue;
            }
            let inserted = self
                .db
                .insert_reading_if_absent(patient.id, entry.sgv, entry.date, now)
                .await?;
            if inserted {
                report.inserted += 1;
            }
        }

        if report.inserted > 0 {
            self.cache.invalidate(patient.id);

            // Same-day data must stay ahead of the watermark: the provider
            // can still emit more readings under today's window.
            let today_start = start_of_day_ms(now);
            if today_start > boundary {
                self.db
                    .set_sync_boundary(patient.id, today_start, now)
                    .await?;
            }
        }

        Ok(report)
    }
}

pub async fn sync_loop<F: CgmFetch>(
    job: SyncJob<F>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                job.run_tick(Utc::now(), &cancel).await;
            }
            _ = cancel.cancelled() => {
                log_info!("sync loop shutting down");
                break;
            }
        }
    }
}

fn start_of_day_ms(now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis()
}

#[cfg(test)]
mod tests {
    use std::{future::Future, sync::Arc, time::Duration};

    use anyhow::anyhow;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use super::{start_of_day_ms, SyncJob};
    use crate::{
        cache::HistoryCache,
        clients::{CgmEntry, CgmFetch, FetchError},
        db::{testing::open_database, Database, DEFAULT_SYNC_START_MS},
        history::HistoryReader,
    };

    // Provider-side behavior: only entries strictly after the requested
    // boundary come back, like the real entries endpoint.
    struct StaticFetcher {
        entries: Vec<CgmEntry>,
    }

    impl CgmFetch for StaticFetcher {
        fn fetch_entries<'s>(
            &'s self,
            _server_url: &'s str,
            since_ms: i64,
        ) -> impl Future<Output = Result<Vec<CgmEntry>, FetchError>> + Send + 's {
            let entries: Vec<CgmEntry> = self
                .entries
                .iter()
                .filter(|entry| entry.date > since_ms)
                .cloned()
                .collect();
            async move { Ok(entries) }
        }
    }

    struct FailingForUrlFetcher {
        fail_url: String,
        entries: Vec<CgmEntry>,
    }

    impl CgmFetch for FailingForUrlFetcher {
        fn fetch_entries<'s>(
            &'s self,
            server_url: &'s str,
            since_ms: i64,
        ) -> impl Future<Output = Result<Vec<CgmEntry>, FetchError>> + Send + 's {
            let result = if server_url == self.fail_url {
                Err(FetchError::Transport(anyhow!("connection refused")))
            } else {
                Ok(self
                    .entries
                    .iter()
                    .filter(|entry| entry.date > since_ms)
                    .cloned()
                    .collect())
            };
            async move { result }
        }
    }

    fn entry(sgv: i32, date: i64) -> CgmEntry {
        CgmEntry { sgv, date }
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    // A day comfortably after the default sync start.
    const DAY_MS: i64 = 86_400_000;
    const NOON_NEXT_DAY: i64 = DEFAULT_SYNC_START_MS + DAY_MS + DAY_MS / 2;

    async fn seed_patient(db: &Database, url: &str) -> i64 {
        db.insert_patient("Ada", url, at(NOON_NEXT_DAY)).await.unwrap()
    }

    fn job_with(db: &Database, cache: &Arc<HistoryCache>, entries: Vec<CgmEntry>) -> SyncJob<StaticFetcher> {
        SyncJob::new(db.clone(), cache.clone(), StaticFetcher { entries })
    }

    #[tokio::test]
    async fn sync_is_idempotent_without_new_provider_data() {
        let (db, _dir) = open_database();
        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let patient_id = seed_patient(&db, "http://cgm.local").await;
        let cancel = CancellationToken::new();

        // Yesterday's readings, synced at noon the next day.
        let entries = vec![
            entry(110, DEFAULT_SYNC_START_MS + 1_000),
            entry(150, DEFAULT_SYNC_START_MS + 2_000),
        ];
        let job = job_with(&db, &cache, entries);
        let now = at(NOON_NEXT_DAY);

        job.run_tick(now, &cancel).await;
        let rows_after_first = db.readings_for_patient(patient_id).await.unwrap();
        let boundary_after_first = db.sync_boundary(patient_id).await.unwrap();

        job.run_tick(now, &cancel).await;
        let rows_after_second = db.readings_for_patient(patient_id).await.unwrap();
        let boundary_after_second = db.sync_boundary(patient_id).await.unwrap();

        assert_eq!(rows_after_first.len(), 2);
        assert_eq!(rows_after_second, rows_after_first);
        assert_eq!(boundary_after_second, boundary_after_first);
    }

    #[tokio::test]
    async fn overlapping_windows_collapse_to_unique_rows() {
        let (db, _dir) = open_database();
        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let patient_id = seed_patient(&db, "http://cgm.local").await;
        let cancel = CancellationToken::new();
        // Same-day resend: the watermark cannot retire today's window, so
        // the second tick re-fetches the overlap and must dedup it.
        let now = at(DEFAULT_SYNC_START_MS + DAY_MS / 2);

        let t = |offset: i64| DEFAULT_SYNC_START_MS + offset;
        let first = job_with(&db, &cache, vec![entry(100, t(100)), entry(101, t(200)), entry(102, t(300))]);
        first.run_tick(now, &cancel).await;

        // Provider resends an overlapping window.
        let second = job_with(&db, &cache, vec![entry(101, t(200)), entry(102, t(300)), entry(103, t(400))]);
        second.run_tick(now, &cancel).await;

        let rows = db.readings_for_patient(patient_id).await.unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn watermark_advances_only_past_whole_days() {
        let (db, _dir) = open_database();
        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let patient_id = seed_patient(&db, "http://cgm.local").await;
        let cancel = CancellationToken::new();

        let now = at(NOON_NEXT_DAY);
        let job = job_with(&db, &cache, vec![entry(110, DEFAULT_SYNC_START_MS + 1_000)]);
        job.run_tick(now, &cancel).await;

        assert_eq!(
            db.sync_boundary(patient_id).await.unwrap(),
            Some(start_of_day_ms(now))
        );
    }

    #[tokio::test]
    async fn watermark_holds_back_on_same_day_data() {
        let (db, _dir) = open_database();
        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let patient_id = seed_patient(&db, "http://cgm.local").await;
        let cancel = CancellationToken::new();

        let now = at(NOON_NEXT_DAY);
        let today_start = start_of_day_ms(now);

        // First tick stores a morning reading and retires yesterday.
        let job = job_with(&db, &cache, vec![entry(110, today_start + 1_000)]);
        job.run_tick(now, &cancel).await;
        assert_eq!(db.sync_boundary(patient_id).await.unwrap(), Some(today_start));

        // A later same-day tick stores more data but must not move the
        // boundary past today's start.
        let later = at(NOON_NEXT_DAY + 60_000);
        let job = job_with(
            &db,
            &cache,
            vec![entry(110, today_start + 1_000), entry(150, today_start + 2_000)],
        );
        job.run_tick(later, &cancel).await;

        assert_eq!(db.sync_boundary(patient_id).await.unwrap(), Some(today_start));
        assert_eq!(db.readings_for_patient(patient_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fetch_failure_skips_patient_without_aborting_tick() {
        let (db, _dir) = open_database();
        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let now = at(NOON_NEXT_DAY);
        let broken_id = db.insert_patient("Ada", "http://broken.local", now).await.unwrap();
        let healthy_id = db.insert_patient("Lin", "http://healthy.local", now).await.unwrap();
        let cancel = CancellationToken::new();

        let job = SyncJob::new(
            db.clone(),
            cache.clone(),
            FailingForUrlFetcher {
                fail_url: "http://broken.local".into(),
                entries: vec![entry(120, DEFAULT_SYNC_START_MS + 1_000)],
            },
        );
        job.run_tick(now, &cancel).await;

        assert!(db.readings_for_patient(broken_id).await.unwrap().is_empty());
        assert_eq!(db.readings_for_patient(healthy_id).await.unwrap().len(), 1);
        // The failed patient keeps its watermark and retries next tick.
        assert_eq!(db.sync_boundary(broken_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn storing_new_readings_invalidates_the_cache() {
        let (db, _dir) = open_database();
        let cache = Arc::new(HistoryCache::new(Duration::from_secs(3600)));
        let patient_id = seed_patient(&db, "http://cgm.local").await;
        let cancel = CancellationToken::new();
        let now = at(NOON_NEXT_DAY);

        // Warm the cache through the read path first.
        let reader = HistoryReader::new(db.clone(), cache.clone());
        reader.readings_for_patient(patient_id).await.unwrap();
        assert!(cache.exists(patient_id));

        let job = job_with(&db, &cache, vec![entry(110, DEFAULT_SYNC_START_MS + 1_000)]);
        job.run_tick(now, &cancel).await;

        assert!(!cache.exists(patient_id));
        let readings = reader.readings_for_patient(patient_id).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].recorded_at_ms, DEFAULT_SYNC_START_MS + 1_000);
    }
}
