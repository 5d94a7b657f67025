//! Application launch collaborators
//!
//! `launch` requests build and start the app before the session attaches.
//! Long-running helpers started along the way (log streams) are handed back
//! as [`PlatformMonitor`]s and disposed when the session tears down.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::common::config::LaunchConfig;
use crate::common::{Error, Result};

use super::args::{LaunchArgs, Platform};

/// Something started by a launch that lives as long as the session
#[async_trait]
pub trait PlatformMonitor: Send {
    fn name(&self) -> &str;

    async fn dispose(self: Box<Self>);
}

/// Builds and starts the application for a `launch` request
#[async_trait]
pub trait AppLauncher: Send + Sync {
    async fn launch(&self, args: &LaunchArgs) -> Result<Vec<Box<dyn PlatformMonitor>>>;
}

/// Runs the configured per-platform command (`npx react-native run-<platform>` by default)
pub struct CommandLauncher {
    config: LaunchConfig,
}

impl CommandLauncher {
    pub fn new(config: LaunchConfig) -> Self {
        Self { config }
    }

    fn command_for(&self, args: &LaunchArgs) -> Result<Vec<String>> {
        let platform = args
            .attach
            .platform
            .ok_or_else(|| Error::LaunchFailed("no platform given".to_string()))?;

        let mut argv = self
            .config
            .commands
            .get(platform.as_str())
            .filter(|argv| !argv.is_empty())
            .cloned()
            .ok_or_else(|| {
                Error::LaunchFailed(format!("no launch command configured for {platform}"))
            })?;
        argv.extend(args.run_arguments.iter().cloned());
        Ok(argv)
    }
}

#[async_trait]
impl AppLauncher for CommandLauncher {
    async fn launch(&self, args: &LaunchArgs) -> Result<Vec<Box<dyn PlatformMonitor>>> {
        let argv = self.command_for(args)?;
        let (program, rest) = argv
            .split_first()
            .ok_or_else(|| Error::LaunchFailed("empty launch command".to_string()))?;

        let mut cmd = Command::new(program);
        cmd.args(rest)
            .envs(&args.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &args.attach.cwd {
            cmd.current_dir(cwd);
        }

        tracing::info!(command = %argv.join(" "), "Launching application");
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::LaunchFailed(format!("failed to run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr
                .lines()
                .rev()
                .find(|line| !line.trim().is_empty())
                .unwrap_or("no output");
            return Err(Error::LaunchFailed(format!(
                "{program} exited with {}: {detail}",
                output.status
            )));
        }
        tracing::debug!(stdout = %String::from_utf8_lossy(&output.stdout), "Launch command finished");

        let mut monitors: Vec<Box<dyn PlatformMonitor>> = Vec::new();
        if args.attach.platform == Some(Platform::Android) && self.config.logcat {
            match LogcatMonitor::start(&self.config.adb) {
                Ok(monitor) => monitors.push(Box::new(monitor)),
                Err(e) => tracing::warn!(error = %e, "Cannot stream logcat"),
            }
        }
        Ok(monitors)
    }
}

/// Streams React Native log tags from `adb logcat` into the log
pub struct LogcatMonitor {
    child: Child,
    reader: JoinHandle<()>,
}

impl LogcatMonitor {
    const FILTER: [&'static str; 3] = ["*:S", "ReactNative:V", "ReactNativeJS:V"];

    pub fn start(adb: &str) -> Result<Self> {
        let mut child = Command::new(adb)
            .arg("logcat")
            .args(Self::FILTER)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::LaunchFailed(format!("failed to start {adb} logcat: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal("logcat stdout not captured".to_string()))?;

        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::info!(target: "logcat", "{line}");
            }
        });

        Ok(Self { child, reader })
    }
}

#[async_trait]
impl PlatformMonitor for LogcatMonitor {
    fn name(&self) -> &str {
        "logcat"
    }

    async fn dispose(mut self: Box<Self>) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "logcat already exited");
        }
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::args::AttachArgs;

    fn launch_args(platform: Platform, extra: &[&str]) -> LaunchArgs {
        LaunchArgs {
            attach: AttachArgs {
                platform: Some(platform),
                ..Default::default()
            },
            run_arguments: extra.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_run_arguments_are_appended() {
        let launcher = CommandLauncher::new(LaunchConfig::default());
        let argv = launcher
            .command_for(&launch_args(Platform::Android, &["--mode", "release"]))
            .unwrap();
        assert_eq!(
            argv,
            vec!["npx", "react-native", "run-android", "--mode", "release"]
        );
    }

    #[test]
    fn test_unconfigured_platform_fails() {
        let launcher = CommandLauncher::new(LaunchConfig::default());
        let err = launcher
            .command_for(&launch_args(Platform::Exponent, &[]))
            .unwrap_err();
        assert!(matches!(err, Error::LaunchFailed(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_command_reports_exit_status() {
        let mut config = LaunchConfig::default();
        config.commands.insert(
            "android".to_string(),
            vec!["sh".into(), "-c".into(), "echo boom >&2; exit 3".into()],
        );

        let err = CommandLauncher::new(config)
            .launch(&launch_args(Platform::Android, &[]))
            .await
            .err()
            .expect("launch should fail");
        let message = err.to_string();
        assert!(message.contains("boom"), "{message}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_command_without_monitors() {
        let mut config = LaunchConfig::default();
        config
            .commands
            .insert("ios".to_string(), vec!["true".into()]);

        let monitors = CommandLauncher::new(config)
            .launch(&launch_args(Platform::Ios, &[]))
            .await
            .unwrap();
        assert!(monitors.is_empty());
    }
}
