use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_path: PathBuf,
    pub sync_interval_secs: u64,
    pub alert_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub push_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cgm_api_secret: Option<String>,
    pub fcm_endpoint: String,
    pub fcm_server_key: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("glucowatch.sqlite3"),
            sync_interval_secs: 60,
            alert_interval_secs: 300,
            fetch_timeout_secs: 15,
            push_timeout_secs: 10,
            cache_ttl_secs: 3600,
            cgm_api_secret: None,
            fcm_endpoint: "https://fcm.googleapis.com/fcm/send".into(),
            fcm_server_key: String::new(),
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file, falling back to defaults when the
    /// file is absent or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_default())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn alert_interval(&self) -> Duration {
        Duration::from_secs(self.alert_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn push_timeout(&self) -> Duration {
        Duration::from_secs(self.push_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
