use anyhow::{Context, Result};
use log::info;
use tokio::{task::JoinHandle, time::Duration};
use tokio_util::sync::CancellationToken;

use crate::clients::{CgmFetch, PushSend};

use super::{
    alert::{alert_loop, AlertJob},
    sync::{sync_loop, SyncJob},
};

/// Owns the two periodic job loops. Each loop is single-flight by
/// construction (a delayed ticker never overlaps itself); the shared
/// cancellation token stops both, letting an in-flight patient unit finish.
pub struct JobScheduler {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    pub fn start<F: CgmFetch, P: PushSend>(
        sync_job: SyncJob<F>,
        alert_job: AlertJob<P>,
        sync_interval: Duration,
        alert_interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();

        let handles = vec![
            tokio::spawn(sync_loop(sync_job, sync_interval, cancel.clone())),
            tokio::spawn(alert_loop(alert_job, alert_interval, cancel.clone())),
        ];

        info!(
            "job scheduler started (sync every {}s, alerts every {}s)",
            sync_interval.as_secs(),
            alert_interval.as_secs()
        );

        Self { cancel, handles }
    }

    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        for handle in self.handles {
            handle.await.context("job loop task failed to join")?;
        }
        info!("job scheduler stopped");
        Ok(())
    }
}
