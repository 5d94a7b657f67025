//! Classic flow: follow the app through the packager
//!
//! The runtime watcher reports every (re)started runtime. A reload while a
//! child session runs terminates that child first; the replacement starts
//! when the IDE confirms the old child is gone.

use async_trait::async_trait;

use crate::common::Result;

use super::args::{AttachArgs, DebugFlow};
use super::context::SessionContext;
use super::status::DebugSessionStatus;
use super::{is_current_child, AttachProgress, FlowStrategy};

pub struct ClassicFlow;

#[async_trait]
impl FlowStrategy for ClassicFlow {
    fn kind(&self) -> DebugFlow {
        DebugFlow::Classic
    }

    async fn attach(&self, ctx: &mut SessionContext, args: AttachArgs) -> Result<AttachProgress> {
        let args = ctx.initialize_settings(args)?;
        ctx.start_proxy(args.handler_kind()).await?;
        ctx.start_watcher()?;
        tracing::info!(session = %ctx.id, address = args.address(), port = ?args.port, "Waiting for the application");
        Ok(AttachProgress::AwaitingApplication)
    }

    async fn on_app_connected(&self, ctx: &mut SessionContext, port: u16, ws_url: String) {
        if ctx.cancel.is_cancelled() || ctx.status.is_stopping() {
            return;
        }
        tracing::debug!(session = %ctx.id, port, %ws_url, status = %ctx.status, "Application connected");

        match ctx.status {
            DebugSessionStatus::ConnectionPending => {
                tracing::debug!(session = %ctx.id, "Reconnect already pending");
            }
            DebugSessionStatus::FirstConnection => {
                ctx.application_ws_url = Some(ws_url);
                ctx.status = DebugSessionStatus::FirstConnectionPending;
                let _ = ctx.establish_debug_session().await;
            }
            DebugSessionStatus::ConnectionAllowed => {
                ctx.application_ws_url = Some(ws_url);
                match ctx.child.clone() {
                    Some(child) => {
                        ctx.status = DebugSessionStatus::ConnectionPending;
                        tracing::info!(session = %ctx.id, %child, "Application reloaded, restarting child session");
                        if let Err(e) = ctx.host.terminate_child_session(&ctx.id, &child).await {
                            tracing::warn!(session = %ctx.id, %child, error = %e, "Cannot terminate child session");
                        }
                    }
                    None => {
                        let _ = ctx.establish_debug_session().await;
                    }
                }
            }
            status => {
                tracing::debug!(session = %ctx.id, %status, "Ignoring application connection");
            }
        }
    }

    async fn on_child_terminated(&self, ctx: &mut SessionContext, child_id: &str) {
        if !is_current_child(ctx, child_id) {
            tracing::debug!(session = %ctx.id, child = child_id, "Ignoring stale child termination");
            return;
        }
        ctx.child = None;

        if ctx.status == DebugSessionStatus::ConnectionPending {
            let _ = ctx.establish_debug_session().await;
        } else if !ctx.status.is_stopping() {
            tracing::info!(session = %ctx.id, child = child_id, "Child session ended");
            ctx.terminate(false).await;
        }
    }
}
