use std::{future::Future, time::Duration};

use anyhow::{Context, Result};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Transport(#[source] anyhow::Error),
    #[error("push delivery rejected with status {status}")]
    Rejected { status: u16 },
}

/// Seam between the alert job and the push transport. Any failure means
/// the message did not reach the device; the caller decides what to do
/// with the token.
pub trait PushSend: Send + Sync + 'static {
    fn send<'s>(
        &'s self,
        token: &'s str,
        title: &'s str,
        body: &'s str,
    ) -> impl Future<Output = Result<(), PushError>> + Send + 's;
}

/// FCM HTTP client.
pub struct FcmClient {
    http: reqwest::Client,
    endpoint: String,
    server_key: String,
}

impl FcmClient {
    pub fn new(endpoint: String, server_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build fcm http client")?;
        Ok(Self {
            http,
            endpoint,
            server_key,
        })
    }
}

impl PushSend for FcmClient {
    fn send<'s>(
        &'s self,
        token: &'s str,
        title: &'s str,
        body: &'s str,
    ) -> impl Future<Output = Result<(), PushError>> + Send + 's {
        async move {
            let payload = json!({
                "to": token,
                "notification": {
                    "title": title,
                    "body": body,
                },
            });

            let response = self
                .http
                .post(&self.endpoint)
                .header(
                    reqwest::header::AUTHORIZATION,
                    format!("key={}", self.server_key),
                )
                .json(&payload)
                .send()
                .await
                .map_err(|err| PushError::Transport(err.into()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(PushError::Rejected {
                    status: status.as_u16(),
                });
            }

            Ok(())
        }
    }
}
