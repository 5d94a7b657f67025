//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// CDP proxy listener settings
    #[serde(default)]
    pub proxy: ProxyConfig,

    /// Debugger endpoint discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Well-known runtime ports
    #[serde(default)]
    pub ports: PortDefaults,

    /// iOS WebKit debug proxy helper
    #[serde(default)]
    pub webkit_proxy: WebkitProxyConfig,

    /// Runtime reload watcher (classic flow)
    #[serde(default)]
    pub watcher: WatcherConfig,

    /// Application launch collaborators
    #[serde(default)]
    pub launch: LaunchConfig,

    /// Defaults merged into the nested debugger configuration
    #[serde(default)]
    pub child: ChildDefaults,
}

/// Where the CDP proxy listens
#[derive(Debug, Deserialize, Clone)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_host")]
    pub host: String,

    #[serde(default = "default_proxy_port")]
    pub port: u16,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_proxy_host(),
            port: default_proxy_port(),
        }
    }
}

fn default_proxy_host() -> String {
    "127.0.0.1".to_string()
}
fn default_proxy_port() -> u16 {
    13602
}

/// Endpoint discovery retry budget
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Total attempts when resolving the runtime's inspector URL
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Per-request HTTP timeout
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl DiscoveryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            backoff_ms: default_backoff_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_attempts() -> u32 {
    90
}
fn default_backoff_ms() -> u64 {
    700
}
fn default_request_timeout() -> u64 {
    5
}

/// Default ports used when a debug configuration leaves them out
#[derive(Debug, Deserialize, Clone)]
pub struct PortDefaults {
    /// Metro packager (also serves the Hermes inspector)
    #[serde(default = "default_packager_port")]
    pub packager: u16,

    /// Device list port of ios_webkit_debug_proxy
    #[serde(default = "default_ios_webkit_proxy_port")]
    pub ios_webkit_proxy: u16,

    #[serde(default = "default_webkit_range_min")]
    pub webkit_range_min: u16,

    #[serde(default = "default_webkit_range_max")]
    pub webkit_range_max: u16,
}

impl Default for PortDefaults {
    fn default() -> Self {
        Self {
            packager: default_packager_port(),
            ios_webkit_proxy: default_ios_webkit_proxy_port(),
            webkit_range_min: default_webkit_range_min(),
            webkit_range_max: default_webkit_range_max(),
        }
    }
}

fn default_packager_port() -> u16 {
    8081
}
fn default_ios_webkit_proxy_port() -> u16 {
    9221
}
fn default_webkit_range_min() -> u16 {
    9223
}
fn default_webkit_range_max() -> u16 {
    9322
}

/// ios_webkit_debug_proxy process settings
#[derive(Debug, Deserialize, Clone)]
pub struct WebkitProxyConfig {
    /// Program name or path
    #[serde(default = "default_webkit_program")]
    pub program: String,

    /// How long to wait before checking the process did not exit immediately
    #[serde(default = "default_spawn_grace_ms")]
    pub spawn_grace_ms: u64,
}

impl WebkitProxyConfig {
    pub fn spawn_grace(&self) -> Duration {
        Duration::from_millis(self.spawn_grace_ms)
    }

    /// Locate the proxy executable, searching PATH for bare names
    pub fn resolve_program(&self) -> Option<PathBuf> {
        let path = Path::new(&self.program);
        if path.is_absolute() {
            return path.exists().then(|| path.to_path_buf());
        }
        which::which(&self.program).ok()
    }
}

impl Default for WebkitProxyConfig {
    fn default() -> Self {
        Self {
            program: default_webkit_program(),
            spawn_grace_ms: default_spawn_grace_ms(),
        }
    }
}

fn default_webkit_program() -> String {
    "ios_webkit_debug_proxy".to_string()
}
fn default_spawn_grace_ms() -> u64 {
    500
}

/// Runtime watcher settings
#[derive(Debug, Deserialize, Clone)]
pub struct WatcherConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}

/// Launch collaborators
#[derive(Debug, Deserialize, Clone)]
pub struct LaunchConfig {
    /// Command used to build and start the app, keyed by platform name
    #[serde(default = "default_launch_commands")]
    pub commands: HashMap<String, Vec<String>>,

    /// Stream `adb logcat` for React Native tags while an Android session runs
    #[serde(default)]
    pub logcat: bool,

    /// adb program name or path
    #[serde(default = "default_adb")]
    pub adb: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            commands: default_launch_commands(),
            logcat: false,
            adb: default_adb(),
        }
    }
}

fn default_launch_commands() -> HashMap<String, Vec<String>> {
    let command = |args: &[&str]| args.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    HashMap::from([
        ("android".to_string(), command(&["npx", "react-native", "run-android"])),
        ("ios".to_string(), command(&["npx", "react-native", "run-ios"])),
        ("windows".to_string(), command(&["npx", "react-native", "run-windows"])),
        ("macos".to_string(), command(&["npx", "react-native", "run-macos"])),
    ])
}

fn default_adb() -> String {
    "adb".to_string()
}

/// Defaults merged into the configuration handed to the nested JS debugger
#[derive(Debug, Deserialize, Clone)]
pub struct ChildDefaults {
    #[serde(default = "default_resolve_locations")]
    pub resolve_source_map_locations: Vec<String>,

    #[serde(default)]
    pub skip_files: Vec<String>,
}

impl Default for ChildDefaults {
    fn default() -> Self {
        Self {
            resolve_source_map_locations: default_resolve_locations(),
            skip_files: Vec::new(),
        }
    }
}

fn default_resolve_locations() -> Vec<String> {
    vec!["**".to_string(), "!**/node_modules/**".to_string()]
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Launch command for a platform, if one is configured
    pub fn launch_command(&self, platform: &str) -> Option<&[String]> {
        self.launch
            .commands
            .get(platform)
            .map(Vec::as_slice)
            .filter(|argv| !argv.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.proxy.port, 13602);
        assert_eq!(config.discovery.attempts, 90);
        assert_eq!(config.discovery.backoff(), Duration::from_millis(700));
        assert_eq!(config.ports.packager, 8081);
        assert!(config.launch_command("android").is_some());
        assert!(config.launch_command("exponent").is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[proxy]
port = 14000

[discovery]
attempts = 3

[launch.commands]
android = ["yarn", "android"]
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.proxy.port, 14000);
        assert_eq!(config.proxy.host, "127.0.0.1");
        assert_eq!(config.discovery.attempts, 3);
        assert_eq!(config.discovery.backoff_ms, 700);
        assert_eq!(
            config.launch_command("android"),
            Some(&["yarn".to_string(), "android".to_string()][..])
        );
        assert!(config.launch_command("ios").is_none());
    }

    #[test]
    fn test_invalid_file_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[proxy]\nport = \"not a number\"").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, super::super::Error::ConfigParse(_)));
    }
}
