use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::{timeout, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    clients::PushSend,
    db::{
        models::{CareRelation, GlucoseReading, Patient, WarningLevel},
        Database,
    },
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const ALERT_PATIENT_TIMEOUT_SECS: u64 = 30;

/// Evaluates every patient's latest reading against each caregiver's alert
/// policy, pushing at most one notification per (caregiver, reading).
pub struct AlertJob<P: PushSend> {
    db: Database,
    sender: P,
}

impl<P: PushSend> AlertJob<P> {
    pub fn new(db: Database, sender: P) -> Self {
        Self { db, sender }
    }

    /// One alert pass over all patients. Failures in a single relation's
    /// unit are logged and skipped; the tick always continues.
    pub async fn run_tick(&self, now: DateTime<Utc>, cancel: &CancellationToken) {
        let patients = match self.db.all_patients().await {
            Ok(patients) => patients,
            Err(err) => {
                log_error!("failed to list patients for alert tick: {err:#}");
                return;
            }
        };

        for patient in patients {
            if cancel.is_cancelled() {
                log_info!("alert tick interrupted by shutdown");
                break;
            }

            let unit = timeout(
                Duration::from_secs(ALERT_PATIENT_TIMEOUT_SECS),
                self.evaluate_patient(&patient, now),
            );
            match unit.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    log_error!("alert evaluation failed for patient {}: {err:#}", patient.id);
                }
                Err(_) => {
                    log_warn!(
                        "alert timeout (> {}s) for patient {}",
                        ALERT_PATIENT_TIMEOUT_SECS,
                        patient.id
                    );
                }
            }
        }
    }

    async fn evaluate_patient(&self, patient: &Patient, now: DateTime<Utc>) -> Result<()> {
        // Only the single most-recent reading is evaluated per tick;
        // readings that arrived and were superseded between ticks are
        // never evaluated.
        let Some(reading) = self.db.latest_reading(patient.id).await? else {
            return Ok(());
        };

        let relations = self.db.relations_for_patient(patient.id).await?;
        for relation in relations {
            if let Err(err) = self.evaluate_relation(patient, &reading, &relation, now).await {
                log_error!(
                    "alert evaluation failed for relation {} (patient {}): {err:#}",
                    relation.id,
                    patient.id
                );
            }
        }

        Ok(())
    }

    async fn evaluate_relation(
        &self,
        patient: &Patient,
        reading: &GlucoseReading,
        relation: &CareRelation,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let Some(policy) = self.db.policy_for_relation(relation.id).await? else {
            return Ok(());
        };
        let Some(push_token) = self.db.push_token_for_caregiver(relation.caregiver_id).await?
        else {
            return Ok(());
        };
        // Idempotency gate, checked before classification: a reading
        // already in the ledger is done for this caregiver.
        if self
            .db
            .notification_exists(relation.caregiver_id, reading.id)
            .await?
        {
            return Ok(());
        }

        let level = WarningLevel::classify(reading.sgv, &policy);
        if level.requires_push() {
            let title = level.notification_title();
            let body = format!("{}'s blood glucose is {}.", patient.name, reading.sgv);

            match self.sender.send(&push_token.token, title, &body).await {
                Ok(()) => {
                    self.db
                        .insert_notification_record(relation.caregiver_id, reading.id, level, now)
                        .await?;
                    log_info!(
                        "sent {} alert to caregiver {} for patient {}",
                        level.as_str(),
                        relation.caregiver_id,
                        patient.id
                    );
                }
                Err(err) => {
                    // The token is presumed stale. Deleting it stops
                    // further attempts until the client registers a new
                    // one; the reading stays unrecorded so a fresh token
                    // picks it up.
                    log_error!(
                        "push delivery failed for caregiver {}: {err}; dropping token",
                        relation.caregiver_id
                    );
                    self.db.delete_push_token(push_token.id).await?;
                }
            }
        } else {
            // Normal readings are recorded without a push so the same
            // reading is not re-evaluated on the next tick.
            self.db
                .insert_notification_record(
                    relation.caregiver_id,
                    reading.id,
                    WarningLevel::Normal,
                    now,
                )
                .await?;
        }

        Ok(())
    }
}

pub async fn alert_loop<P: PushSend>(
    job: AlertJob<P>,
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
                log_info!("alert loop shutting down");
                break;
            }
        }
    }
}
