use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use log::info;

use glucowatch::{
    clients::{CgmClient, FcmClient},
    AlertJob, Database, HistoryCache, JobScheduler, Settings, SyncJob,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("glucowatch starting up...");

    let settings_path = std::env::var("GLUCOWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("glucowatch.json"));
    let settings = Settings::load(&settings_path)?;

    let database = Database::new(settings.database_path.clone())?;
    let cache = Arc::new(HistoryCache::new(settings.cache_ttl()));

    let cgm_client = CgmClient::new(settings.fetch_timeout(), settings.cgm_api_secret.clone())?;
    let fcm_client = FcmClient::new(
        settings.fcm_endpoint.clone(),
        settings.fcm_server_key.clone(),
        settings.push_timeout(),
    )?;

    let scheduler = JobScheduler::start(
        SyncJob::new(database.clone(), cache.clone(), cgm_client),
        AlertJob::new(database.clone(), fcm_client),
        settings.sync_interval(),
        settings.alert_interval(),
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    scheduler.shutdown().await?;
    info!("glucowatch stopped");

    Ok(())
}
