//! State shared by both session flows
//!
//! A [`SessionContext`] is owned by exactly one session actor; flows borrow
//! it mutably while handling an event, so status transitions never race.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cdp::HandlerKind;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::endpoint::{parse_base_url, EndpointResolver};
use crate::proxy::ProxyServer;

use super::actor::SessionEvent;
use super::args::{AttachArgs, DebugFlow, LaunchArgs, Platform};
use super::host::{ChildSessionConfig, HostIde};
use super::launcher::{AppLauncher, PlatformMonitor};
use super::status::DebugSessionStatus;
use super::watcher::spawn_runtime_watcher;
use super::webkit::WebkitProxy;

/// Debugger type for the nested session
pub const NODE_DEBUGGER_TYPE: &str = "pwa-node";
pub const CHROME_DEBUGGER_TYPE: &str = "pwa-chrome";

pub struct SessionContext {
    pub id: String,
    pub config: Arc<Config>,
    pub status: DebugSessionStatus,
    /// Settings-initialized attach arguments
    pub args: Option<AttachArgs>,
    pub cancel: CancellationToken,
    pub host: Arc<dyn HostIde>,
    pub launcher: Arc<dyn AppLauncher>,
    pub resolver: EndpointResolver,
    pub proxy: Option<ProxyServer>,
    /// Inspector URL of the current application runtime
    pub application_ws_url: Option<String>,
    /// Id of the running nested session, once the IDE reported it
    pub child: Option<String>,
    pub webkit_proxy: Option<WebkitProxy>,
    pub monitors: Vec<Box<dyn PlatformMonitor>>,
    pub watcher: Option<JoinHandle<()>>,
    /// Reply for an attach that completes when the app first connects
    pub pending_attach: Option<oneshot::Sender<Result<()>>>,
    events: mpsc::WeakSender<SessionEvent>,
}

impl SessionContext {
    pub fn new(
        id: String,
        config: Arc<Config>,
        host: Arc<dyn HostIde>,
        launcher: Arc<dyn AppLauncher>,
        cancel: CancellationToken,
        events: mpsc::WeakSender<SessionEvent>,
    ) -> Result<Self> {
        let resolver = EndpointResolver::from_config(&config.discovery)?;
        Ok(Self {
            id,
            config,
            status: DebugSessionStatus::FirstConnection,
            args: None,
            cancel,
            host,
            launcher,
            resolver,
            proxy: None,
            application_ws_url: None,
            child: None,
            webkit_proxy: None,
            monitors: Vec::new(),
            watcher: None,
            pending_attach: None,
            events,
        })
    }

    /// Default-fill `args` and keep them; settings are initialized once
    pub fn initialize_settings(&mut self, mut args: AttachArgs) -> Result<AttachArgs> {
        if let Some(args) = &self.args {
            return Ok(args.clone());
        }
        args.initialize_settings(&self.config)?;
        tracing::debug!(session = %self.id, ?args, "Initialized session settings");
        self.args = Some(args.clone());
        Ok(args)
    }

    fn settings(&self) -> Result<&AttachArgs> {
        self.args
            .as_ref()
            .ok_or_else(|| Error::Internal("session settings not initialized".to_string()))
    }

    /// Run the launcher, keeping its monitors for teardown
    pub async fn launch_app(&mut self, args: &LaunchArgs) -> Result<()> {
        let launched = tokio::select! {
            _ = self.cancel.cancelled() => {
                return Err(Error::cancelled("application launch", None));
            }
            launched = self.launcher.launch(args) => launched?,
        };
        self.monitors.extend(launched);
        Ok(())
    }

    /// Start the CDP proxy on the configured address
    pub async fn start_proxy(&mut self, handler: HandlerKind) -> Result<()> {
        if let Some(proxy) = self.proxy.take() {
            proxy.stop().await;
        }
        let proxy =
            ProxyServer::create(&self.config.proxy.host, self.config.proxy.port, handler).await?;
        let session = self.id.clone();
        proxy
            .on_connection_established(Arc::new(move |target| {
                tracing::info!(%session, application = %target, "JS debugger attached through proxy");
            }))
            .await;
        self.proxy = Some(proxy);
        Ok(())
    }

    /// Poll `address:port` for new runtimes
    pub fn start_watcher(&mut self) -> Result<()> {
        let args = self.settings()?;
        let port = args.port.unwrap_or(self.config.ports.packager);
        let base = parse_base_url(&format!("{}:{port}", args.address()))?;

        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.watcher = Some(spawn_runtime_watcher(
            self.resolver.clone(),
            base,
            self.config.watcher.poll_interval(),
            self.events.clone(),
            self.cancel.child_token(),
        ));
        Ok(())
    }

    /// Configuration for the nested JS debugger session
    pub fn child_config(&self) -> Result<ChildSessionConfig> {
        let args = self.settings()?;
        let proxy = self
            .proxy
            .as_ref()
            .ok_or_else(|| Error::Internal("CDP proxy not started".to_string()))?;
        let application = self
            .application_ws_url
            .as_deref()
            .ok_or_else(|| Error::Internal("application runtime not resolved".to_string()))?;

        let debugger_type = if args.is_ios_webkit() && args.flow() == DebugFlow::Direct {
            CHROME_DEBUGGER_TYPE
        } else {
            NODE_DEBUGGER_TYPE
        };
        let name = match args.platform {
            Some(Platform::Ios) => "React Native Debugger (iOS)",
            Some(Platform::Android) => "React Native Debugger (Android)",
            _ => "React Native Debugger",
        };

        let mut skip_files = self.config.child.skip_files.clone();
        skip_files.extend(args.skip_files.iter().cloned());

        Ok(ChildSessionConfig {
            debugger_type: debugger_type.to_string(),
            request: "attach".to_string(),
            name: name.to_string(),
            port: proxy.port(),
            websocket_address: proxy.debugger_url(application)?.to_string(),
            rn_debug_session_id: self.id.clone(),
            continue_on_attach: true,
            source_maps: args.source_maps.unwrap_or(true),
            resolve_source_map_locations: self.config.child.resolve_source_map_locations.clone(),
            source_map_path_overrides: args.source_map_path_overrides.clone(),
            skip_files,
            cwd: args.cwd.clone(),
        })
    }

    /// Ask the host to start the nested session
    ///
    /// Answers a pending attach. A failed first connection releases the
    /// session's resources and stays `ConnectionFailed`; later failures
    /// settle into `ConnectionAllowed` so a reload can retry.
    pub async fn establish_debug_session(&mut self) -> Result<()> {
        let config = match self.child_config() {
            Ok(config) => config,
            Err(e) => return Err(self.connection_failed(e.to_string()).await),
        };

        tracing::info!(
            session = %self.id,
            websocket = %config.websocket_address,
            "Starting child debug session"
        );
        match self.host.start_child_session(&config).await {
            Ok(true) => {
                self.status = DebugSessionStatus::ConnectionDone;
                self.set_connection_allowed_if_possible();
                if let Some(reply) = self.pending_attach.take() {
                    let _ = reply.send(Ok(()));
                }
                Ok(())
            }
            Ok(false) => Err(self
                .connection_failed("the IDE refused to start it".to_string())
                .await),
            Err(e) => Err(self.connection_failed(e.to_string()).await),
        }
    }

    async fn connection_failed(&mut self, reason: String) -> Error {
        tracing::error!(session = %self.id, %reason, "Child debug session failed");
        let first = self.status == DebugSessionStatus::FirstConnectionPending;
        self.status = DebugSessionStatus::ConnectionFailed;
        if !first {
            self.set_connection_allowed_if_possible();
        }

        if let Some(reply) = self.pending_attach.take() {
            self.release_resources().await;
            let _ = reply.send(Err(Error::ChildSessionFailed(reason.clone())));
        }
        Error::ChildSessionFailed(reason)
    }

    /// `ConnectionDone`/`ConnectionFailed` settle into `ConnectionAllowed`
    pub fn set_connection_allowed_if_possible(&mut self) {
        if matches!(
            self.status,
            DebugSessionStatus::ConnectionDone | DebugSessionStatus::ConnectionFailed
        ) {
            self.status = DebugSessionStatus::ConnectionAllowed;
        }
    }

    /// Undo a failed attach so no partial state is left behind
    pub async fn release_resources(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        if let Some(proxy) = self.proxy.take() {
            proxy.stop().await;
        }
        if let Some(webkit) = self.webkit_proxy.take() {
            webkit.stop().await;
        }
        for monitor in self.monitors.drain(..) {
            tracing::debug!(monitor = monitor.name(), "Disposing monitor");
            monitor.dispose().await;
        }
    }

    /// Tear the session down and tell the host
    pub async fn terminate(&mut self, forced_stop: bool) {
        if self.status.is_stopping() {
            return;
        }
        tracing::info!(session = %self.id, forced_stop, "Stopping debug session");
        self.status = DebugSessionStatus::Stopping;
        self.cancel.cancel();
        self.release_resources().await;

        if let Some(child) = self.child.take() {
            if let Err(e) = self.host.terminate_child_session(&self.id, &child).await {
                tracing::debug!(session = %self.id, %child, error = %e, "Child session already gone");
            }
        }

        // An attach still waiting for the app ends quietly
        if let Some(reply) = self.pending_attach.take() {
            let _ = reply.send(Ok(()));
        }

        self.host.session_terminated(&self.id, forced_stop).await;
        self.status = DebugSessionStatus::Stopped;
    }
}
