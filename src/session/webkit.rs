//! iOS WebKit debug proxy helper
//!
//! Non-Hermes iOS apps expose their JS context through
//! `ios_webkit_debug_proxy`. The proxy lists attached devices on one port
//! and gives each device its own port from a configured range.

use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use crate::common::config::WebkitProxyConfig;
use crate::common::{Error, Result};
use crate::endpoint::{retry, RetryError, RetryPolicy};

/// `target` value that selects the simulator
pub const SIMULATOR_TARGET: &str = "simulator";
/// Device id the proxy reports for the simulator
pub const SIMULATOR_DEVICE_ID: &str = "SIMULATOR";

/// One entry of the proxy's `/json` device list
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceEntry {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub device_name: String,
    /// `host:port` of the device's page list
    pub url: String,
}

/// A running `ios_webkit_debug_proxy`
pub struct WebkitProxy {
    child: Child,
    port: u16,
    client: reqwest::Client,
}

impl WebkitProxy {
    /// Start the proxy listing devices on `port`, one port per device from `range`
    pub async fn start(config: &WebkitProxyConfig, port: u16, range: (u16, u16)) -> Result<Self> {
        let program = config.resolve_program().ok_or_else(|| {
            Error::WebkitProxy(format!("'{}' not found in PATH", config.program))
        })?;

        let port_map = format!("null:{port},:{}-{}", range.0, range.1);
        tracing::info!(program = %program.display(), %port_map, "Starting iOS WebKit debug proxy");

        let mut child = Command::new(&program)
            .arg("-c")
            .arg(&port_map)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::WebkitProxy(format!("failed to start {}: {e}", program.display())))?;

        tokio::time::sleep(config.spawn_grace()).await;
        if let Some(status) = child.try_wait()? {
            return Err(Error::WebkitProxy(format!("exited immediately with {status}")));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()?;

        Ok(Self { child, port, client })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Find the port serving `target`'s pages, retrying while devices attach
    pub async fn device_port(
        &self,
        target: Option<&str>,
        policy: RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<u16> {
        let address = format!("localhost:{}", self.port);
        let lookup = move |_attempt: u32| async move {
            let devices = self.devices().await?;
            let device = select_device(&devices, target)
                .ok_or_else(|| Error::DeviceNotFound(target.unwrap_or("any").to_string()))?;
            parse_device_port(&device.url).ok_or_else(|| {
                Error::WebkitProxy(format!("device '{}' has no port in '{}'", device.device_name, device.url))
            })
        };

        match retry(policy, cancel, lookup).await {
            Ok(port) => {
                tracing::info!(port, "Found iOS device");
                Ok(port)
            }
            Err(RetryError::Exhausted { last, .. }) => Err(last),
            Err(RetryError::Cancelled { last, .. }) => Err(Error::cancelled(&address, last)),
        }
    }

    async fn devices(&self) -> Result<Vec<DeviceEntry>> {
        let url = format!("http://localhost:{}/json", self.port);
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn stop(mut self) {
        tracing::debug!(port = self.port, "Stopping iOS WebKit debug proxy");
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "WebKit debug proxy already exited");
        }
    }
}

/// Pick the device matching `target`
///
/// `simulator` picks the simulator entry; any other target matches a device
/// id or name; no target picks the first device.
pub fn select_device<'a>(devices: &'a [DeviceEntry], target: Option<&str>) -> Option<&'a DeviceEntry> {
    match target {
        None => devices.first(),
        Some(t) if t.eq_ignore_ascii_case(SIMULATOR_TARGET) => devices
            .iter()
            .find(|d| d.device_id == SIMULATOR_DEVICE_ID),
        Some(t) => devices
            .iter()
            .find(|d| d.device_id == t || d.device_name == t),
    }
}

/// Port out of a device `url` such as `localhost:9223`
pub fn parse_device_port(url: &str) -> Option<u16> {
    url.rsplit_once(':')
        .and_then(|(_, port)| port.trim_end_matches('/').parse().ok())
}
