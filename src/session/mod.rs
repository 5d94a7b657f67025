//! React Native debug sessions
//!
//! A session owns a CDP proxy and drives nested JS debugger sessions in the
//! IDE. Two flows exist: the classic flow follows app reloads through the
//! packager, the direct flow attaches straight to a runtime inspector.

pub mod actor;
pub mod args;
pub mod classic;
pub mod context;
pub mod direct;
pub mod host;
pub mod launcher;
pub mod registry;
pub mod status;
pub mod watcher;
pub mod webkit;

use async_trait::async_trait;

use crate::common::Result;

pub use actor::{SessionEvent, SessionHandle};
pub use args::{AttachArgs, DebugFlow, LaunchArgs, Platform};
pub use context::SessionContext;
pub use host::{ChildSessionConfig, HostIde};
pub use launcher::{AppLauncher, CommandLauncher, PlatformMonitor};
pub use registry::SessionRegistry;
pub use status::DebugSessionStatus;

/// How an attach request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachProgress {
    /// Child session is running
    Attached,
    /// Completes when the application first connects
    AwaitingApplication,
}

/// Flow-specific reactions to session events
#[async_trait]
pub trait FlowStrategy: Send + Sync {
    fn kind(&self) -> DebugFlow;

    async fn attach(&self, ctx: &mut SessionContext, args: AttachArgs) -> Result<AttachProgress>;

    /// A (new) application runtime is available at `ws_url`
    async fn on_app_connected(&self, ctx: &mut SessionContext, port: u16, ws_url: String);

    /// The IDE reports a nested session has ended
    async fn on_child_terminated(&self, ctx: &mut SessionContext, child_id: &str);
}

impl DebugFlow {
    pub fn strategy(self) -> Box<dyn FlowStrategy> {
        match self {
            Self::Classic => Box::new(classic::ClassicFlow),
            Self::Direct => Box::new(direct::DirectFlow),
        }
    }
}

/// Whether a child-terminated notification is about the current child
///
/// Notifications for an earlier child are stale.
pub(crate) fn is_current_child(ctx: &SessionContext, child_id: &str) -> bool {
    match ctx.child.as_deref() {
        Some(current) => current == child_id,
        None => true,
    }
}
