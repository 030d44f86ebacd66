//! HTTP fetch gateway for the etcd endpoints.
//!
//! Every call is independent: it has its own timeout and any failure
//! (network, timeout, HTTP status, decode) is logged and reported to the
//! caller as an absent response.

use std::future::Future;
use std::time::Duration;

use reqwest::{Certificate, Client, Identity};
use serde_json::Value;
use tracing::{error, warn};

use crate::config::TlsConfig;
use crate::error::FetchError;

/// Member listing.
pub const MEMBERS_PATH: &str = "/v2/members";
/// Self statistics, carries the member's role.
pub const SELF_STATS_PATH: &str = "/v2/stats/self";
/// Store statistics.
pub const STORE_STATS_PATH: &str = "/v2/stats/store";
/// Per-follower statistics, only served by the leader.
pub const LEADER_STATS_PATH: &str = "/v2/stats/leader";
/// Text exposition metrics.
pub const METRICS_PATH: &str = "/metrics";

/// Source of endpoint payloads for a poll cycle.
pub trait Fetcher {
    /// GET `url` and decode the body as JSON. `None` on any failure.
    fn fetch_json(&self, url: &str) -> impl Future<Output = Option<Value>> + Send;

    /// GET `url` and return the body as text. `None` on any failure.
    fn fetch_text(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// [`Fetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a client with the given per-call timeout and TLS settings.
    ///
    /// Certificate and key files are read here, once.
    pub fn new(timeout: Duration, tls: &TlsConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder().timeout(timeout).use_rustls_tls();

        if let Some(ref ca_path) = tls.ca_cert {
            let pem = std::fs::read(ca_path).map_err(|e| {
                FetchError::Tls(format!("failed to read CA '{}': {}", ca_path.display(), e))
            })?;
            let certificate =
                Certificate::from_pem(&pem).map_err(|e| FetchError::Tls(e.to_string()))?;
            builder = builder.add_root_certificate(certificate);
        }

        if let (Some(cert_path), Some(key_path)) = (&tls.client_cert, &tls.client_key) {
            let mut pem = std::fs::read(cert_path).map_err(|e| {
                FetchError::Tls(format!(
                    "failed to read client certificate '{}': {}",
                    cert_path.display(),
                    e
                ))
            })?;
            let key = std::fs::read(key_path).map_err(|e| {
                FetchError::Tls(format!(
                    "failed to read client key '{}': {}",
                    key_path.display(),
                    e
                ))
            })?;
            pem.push(b'\n');
            pem.extend_from_slice(&key);
            let identity = Identity::from_pem(&pem).map_err(|e| FetchError::Tls(e.to_string()))?;
            builder = builder.identity(identity);
        }

        if !tls.verify {
            warn!("TLS certificate verification disabled - not recommended for production");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build().map_err(|e| FetchError::Tls(e.to_string()))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response)
    }

    /// GET `url` and decode the body as JSON.
    pub async fn try_fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let body = self.get(url).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// GET `url` and return the body as text.
    pub async fn try_fetch_text(&self, url: &str) -> Result<String, FetchError> {
        Ok(self.get(url).await?.text().await?)
    }
}

fn log_failure(url: &str, err: &FetchError) {
    match err {
        FetchError::Timeout => warn!(url, error = %err, "API call timed out"),
        FetchError::Decode(_) => error!(url, error = %err, "JSON parsing failed"),
        _ => warn!(url, error = %err, "API call failed"),
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Option<Value> {
        self.try_fetch_json(url)
            .await
            .inspect_err(|e| log_failure(url, e))
            .ok()
    }

    async fn fetch_text(&self, url: &str) -> Option<String> {
        self.try_fetch_text(url)
            .await
            .inspect_err(|e| log_failure(url, e))
            .ok()
    }
}
