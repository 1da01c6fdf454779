//! HTTP client for the IRKit internet API.

use std::time::Duration;

use anyhow::{Context, Result};
use log::info;
use reqwest::StatusCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::signal::{Envelope, Signal};

pub const DEFAULT_ENDPOINT: &str = "https://api.getirkit.com/1/messages";

const CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to remote service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote service responded with {0}")]
    Status(String),
    #[error("failed to decode remote payload: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to encode signal: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("request cancelled")]
    Cancelled,
}

#[derive(Clone)]
pub struct RemoteClient {
    http: reqwest::Client,
    endpoint: String,
    client_key: String,
}

impl RemoteClient {
    pub fn new(endpoint: impl Into<String>, client_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("irlog/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            client_key: client_key.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetches the next pending signal and asks the service to clear it.
    ///
    /// `Ok(None)` means the service answered with an empty body: nothing is
    /// pending. Cancelling `cancel` abandons the request and yields
    /// [`RemoteError::Cancelled`].
    pub async fn fetch_pending(
        &self,
        cancel: CancellationToken,
    ) -> Result<Option<Envelope>, RemoteError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(RemoteError::Cancelled),
            outcome = self.request_pending() => outcome,
        }
    }

    async fn request_pending(&self) -> Result<Option<Envelope>, RemoteError> {
        info!("request GET {} clear=1", self.endpoint);

        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("clientkey", self.client_key.as_str()), ("clear", "1")])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RemoteError::Status(status.to_string()));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(RemoteError::Decode)
    }

    /// Sends `signal` to the device identified by `device_id`.
    pub async fn replay(&self, device_id: &str, signal: &Signal) -> Result<(), RemoteError> {
        let message = serde_json::to_string(signal).map_err(RemoteError::Encode)?;

        info!("request POST {} deviceid={}", self.endpoint, device_id);

        let response = self
            .http
            .post(&self.endpoint)
            .form(&[
                ("clientkey", self.client_key.as_str()),
                ("deviceid", device_id),
                ("message", message.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(RemoteError::Status(status.to_string()));
        }

        Ok(())
    }
}
