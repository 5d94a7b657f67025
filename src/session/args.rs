//! Launch and attach configuration
//!
//! These mirror the debug configuration the IDE sends with `launch` and
//! `attach` requests. Unset fields are filled once per session by
//! [`AttachArgs::initialize_settings`].

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::cdp::HandlerKind;
use crate::common::config::Config;
use crate::common::{Error, Result};

/// Debug type that selects the direct (Hermes / iOS WebKit) flow
pub const DIRECT_DEBUG_TYPE: &str = "reactnativedirect";

/// Address used when the configuration does not name one
pub const DEFAULT_ADDRESS: &str = "localhost";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
    Exponent,
    Windows,
    Macos,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Exponent => "exponent",
            Self::Windows => "windows",
            Self::Macos => "macos",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which session flow drives the debugging connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugFlow {
    /// Runtime reached through the packager; app reloads restart the child session
    Classic,
    /// Runtime inspector reached directly (Hermes, iOS WebKit)
    Direct,
}

impl std::fmt::Display for DebugFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Direct => write!(f, "direct"),
        }
    }
}

/// `attach` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachArgs {
    /// Debug configuration type (`reactnative`, `reactnativedirect`)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub debug_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub use_hermes_engine: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webkit_range_min: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webkit_range_max: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_maps: Option<bool>,
    #[serde(default)]
    pub source_map_path_overrides: BTreeMap<String, String>,
    #[serde(default)]
    pub skip_files: Vec<String>,
    /// Simulator, device, or a device name/id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
}

/// `launch` configuration: attach settings plus how to start the app
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArgs {
    #[serde(flatten)]
    pub attach: AttachArgs,
    /// Extra arguments appended to the platform launch command
    #[serde(default)]
    pub run_arguments: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl AttachArgs {
    pub fn flow(&self) -> DebugFlow {
        match self.debug_type.as_deref() {
            Some(DIRECT_DEBUG_TYPE) => DebugFlow::Direct,
            _ => DebugFlow::Classic,
        }
    }

    pub fn is_ios_webkit(&self) -> bool {
        self.platform == Some(Platform::Ios) && !self.use_hermes_engine
    }

    /// Message handler matching the target runtime
    pub fn handler_kind(&self) -> HandlerKind {
        match self.flow() {
            DebugFlow::Classic => HandlerKind::Rn,
            DebugFlow::Direct if self.use_hermes_engine => HandlerKind::Hermes,
            DebugFlow::Direct if self.is_ios_webkit() => HandlerKind::IosDirect,
            DebugFlow::Direct => HandlerKind::Passthrough,
        }
    }

    /// Runtime address, defaulted
    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(DEFAULT_ADDRESS)
    }

    /// Fill unset fields from `config`
    ///
    /// Fails when the direct flow has no way to find the runtime's port.
    pub fn initialize_settings(&mut self, config: &Config) -> Result<()> {
        if self.address.is_none() {
            self.address = Some(DEFAULT_ADDRESS.to_string());
        }
        if self.source_maps.is_none() {
            self.source_maps = Some(true);
        }

        if self.port.is_none() {
            let port = match self.flow() {
                DebugFlow::Classic => config.ports.packager,
                DebugFlow::Direct if self.use_hermes_engine => config.ports.packager,
                DebugFlow::Direct if self.is_ios_webkit() => config.ports.ios_webkit_proxy,
                DebugFlow::Direct => {
                    let platform = self
                        .platform
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "unspecified".to_string());
                    return Err(Error::unsupported_platform(platform, "direct"));
                }
            };
            self.port = Some(port);
        }

        if self.is_ios_webkit() {
            self.webkit_range_min.get_or_insert(config.ports.webkit_range_min);
            self.webkit_range_max.get_or_insert(config.ports.webkit_range_max);
        }

        Ok(())
    }
}
