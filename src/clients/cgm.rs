use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

const ENTRIES_ENDPOINT: &str = "/api/v1/entries.json";
const MAX_ENTRIES_COUNT: u32 = 99_999;

/// One provider-side glucose entry. Unknown fields in the provider payload
/// are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct CgmEntry {
    pub sgv: i32,
    pub date: i64,
}

/// The sync job treats both variants the same (skip the patient, retry on
/// the next tick) but logs them at different levels, so the split must be
/// visible at the call site.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cgm request failed: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("cgm response malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Seam between the sync job and the CGM provider.
pub trait CgmFetch: Send + Sync + 'static {
    fn fetch_entries<'s>(
        &'s self,
        server_url: &'s str,
        since_ms: i64,
    ) -> impl Future<Output = Result<Vec<CgmEntry>, FetchError>> + Send + 's;
}

/// HTTP client for Nightscout-style CGM servers.
pub struct CgmClient {
    http: reqwest::Client,
    api_secret: Option<String>,
}

impl CgmClient {
    pub fn new(timeout: Duration, api_secret: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build cgm http client")?;
        Ok(Self { http, api_secret })
    }
}

fn entries_url(server_url: &str, since_ms: i64) -> String {
    format!(
        "{}{}?count={}&find[date][$gt]={}",
        server_url.trim_end_matches('/'),
        ENTRIES_ENDPOINT,
        MAX_ENTRIES_COUNT,
        since_ms
    )
}

impl CgmFetch for CgmClient {
    fn fetch_entries<'s>(
        &'s self,
        server_url: &'s str,
        since_ms: i64,
    ) -> impl Future<Output = Result<Vec<CgmEntry>, FetchError>> + Send + 's {
        async move {
            let mut request = self
                .http
                .get(entries_url(server_url, since_ms))
                .header(reqwest::header::ACCEPT, "application/json");
            if let Some(secret) = &self.api_secret {
                request = request.header("api-secret", secret);
            }

            let response = request
                .send()
                .await
                .map_err(|err| FetchError::Transport(err.into()))?
                .error_for_status()
                .map_err(|err| FetchError::Transport(err.into()))?;

            let body = response
                .text()
                .await
                .map_err(|err| FetchError::Transport(err.into()))?;

            serde_json::from_str(&body).map_err(FetchError::Malformed)
        }
    }
}
