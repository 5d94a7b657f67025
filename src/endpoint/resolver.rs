//! Debugger endpoint discovery
//!
//! Runtimes publish their inspector WebSocket URL over HTTP:
//! `/json/version` (Chrome-style, top-level target) or `/json/list`
//! (Node/Hermes-style, one entry per target).

use std::time::Duration;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::common::config::DiscoveryConfig;
use crate::common::{Error, Result};

use super::loopback::relaxes_certificate_validation;
use super::retry::{retry, RetryError, RetryPolicy};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TargetDescription {
    #[serde(default)]
    web_socket_debugger_url: Option<String>,
}

/// Resolves inspector WebSocket URLs from a runtime's HTTP base URL
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    /// Full certificate validation
    client: reqwest::Client,
    /// Only used for https targets on this machine
    loopback_client: reqwest::Client,
    backoff: Duration,
}

impl EndpointResolver {
    pub fn new(request_timeout: Duration, backoff: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .no_proxy()
            .build()?;
        let loopback_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .no_proxy()
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            client,
            loopback_client,
            backoff,
        })
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::new(config.request_timeout(), config.backoff())
    }

    /// Resolve the inspector URL once
    ///
    /// `/json/list` is consulted whenever `/json/version` yields no URL,
    /// including when it cannot be fetched at all.
    pub async fn get_ws_endpoint(&self, base: &Url) -> Result<String> {
        match self.fetch_json::<TargetDescription>(base, "/json/version").await {
            Ok(TargetDescription {
                web_socket_debugger_url: Some(url),
            }) => return Ok(url),
            Ok(_) => {}
            Err(e) => tracing::debug!(%base, error = %e, "No usable /json/version, trying /json/list"),
        }

        let list: Vec<TargetDescription> = self.fetch_json(base, "/json/list").await?;
        list.into_iter()
            .next()
            .and_then(|target| target.web_socket_debugger_url)
            .ok_or_else(|| Error::NoDebuggableTarget(base.to_string()))
    }

    /// Resolve the inspector URL, retrying with a fixed backoff
    ///
    /// Fails with [`Error::CouldNotConnectToDebugTarget`] once `max_attempts`
    /// attempts failed, or with [`Error::Cancelled`] as soon as `cancel` fires.
    pub async fn retry_get_ws_endpoint(
        &self,
        base: &Url,
        max_attempts: u32,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let policy = RetryPolicy::new(max_attempts, self.backoff);
        let address = base.to_string();

        tracing::debug!(%address, max_attempts, "Resolving debugger endpoint");
        match retry(policy, cancel, |_| self.get_ws_endpoint(base)).await {
            Ok(url) => {
                tracing::info!(%address, ws_url = %url, "Resolved debugger endpoint");
                Ok(url)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                tracing::warn!(%address, attempts, error = %last, "Giving up on debugger endpoint");
                Err(Error::could_not_connect(&address, last))
            }
            Err(RetryError::Cancelled { attempts, last }) => {
                tracing::debug!(%address, attempts, "Endpoint discovery cancelled");
                Err(Error::could_not_connect(
                    &address,
                    Error::cancelled(&address, last),
                ))
            }
        }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, base: &Url, path: &str) -> Result<T> {
        let url = base
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid endpoint URL {base}: {e}")))?;

        tracing::trace!(%url, "GET");
        let client = self.client_for(&url).await;
        let body = client.get(url).send().await?.error_for_status()?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn client_for(&self, url: &Url) -> &reqwest::Client {
        if relaxes_certificate_validation(url).await {
            &self.loopback_client
        } else {
            &self.client
        }
    }
}

/// Parse a runtime base address, accepting bare `host:port`
pub fn parse_base_url(address: &str) -> Result<Url> {
    let candidate = if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    Url::parse(&candidate).map_err(|e| Error::Config(format!("Invalid address '{address}': {e}")))
}
