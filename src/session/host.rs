//! What a debug session needs from the IDE hosting it

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::Result;

/// Debug configuration for the nested JS debugger session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildSessionConfig {
    /// `pwa-node` or `pwa-chrome`
    #[serde(rename = "type")]
    pub debugger_type: String,
    pub request: String,
    pub name: String,
    /// Port of the CDP proxy
    pub port: u16,
    /// Proxy URL carrying the application's inspector in its `browser` parameter
    pub websocket_address: String,
    /// Id of the parent React Native session
    pub rn_debug_session_id: String,
    pub continue_on_attach: bool,
    pub source_maps: bool,
    pub resolve_source_map_locations: Vec<String>,
    pub source_map_path_overrides: BTreeMap<String, String>,
    pub skip_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// IDE operations a session drives
///
/// Implemented by the DAP adapter; tests substitute a recording host.
#[async_trait]
pub trait HostIde: Send + Sync {
    /// Ask the IDE to start a nested JS debugging session
    ///
    /// Returns whether the IDE accepted the request.
    async fn start_child_session(&self, config: &ChildSessionConfig) -> Result<bool>;

    /// Ask the IDE to terminate a nested session
    async fn terminate_child_session(&self, session_id: &str, child_id: &str) -> Result<()>;

    /// The session has torn down
    async fn session_terminated(&self, session_id: &str, forced_stop: bool);
}
