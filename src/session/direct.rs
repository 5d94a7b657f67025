//! Direct flow: attach straight to a runtime inspector
//!
//! Hermes publishes its inspector through the packager; non-Hermes iOS apps
//! are reached through `ios_webkit_debug_proxy`. There is one child session
//! per attach and no reload handling.

use async_trait::async_trait;

use crate::common::Result;
use crate::endpoint::{parse_base_url, RetryPolicy};

use super::args::{AttachArgs, DebugFlow};
use super::context::SessionContext;
use super::status::DebugSessionStatus;
use super::webkit::WebkitProxy;
use super::{is_current_child, AttachProgress, FlowStrategy};

pub struct DirectFlow;

impl DirectFlow {
    /// Start the WebKit proxy and find the port of the selected device
    async fn webkit_device_port(ctx: &mut SessionContext, args: &AttachArgs) -> Result<u16> {
        let list_port = args.port.unwrap_or(ctx.config.ports.ios_webkit_proxy);
        let range = (
            args.webkit_range_min.unwrap_or(ctx.config.ports.webkit_range_min),
            args.webkit_range_max.unwrap_or(ctx.config.ports.webkit_range_max),
        );

        let webkit = WebkitProxy::start(&ctx.config.webkit_proxy, list_port, range).await?;
        let policy = RetryPolicy::new(ctx.config.discovery.attempts, ctx.config.discovery.backoff());
        let found = webkit
            .device_port(args.target.as_deref(), policy, &ctx.cancel)
            .await;
        ctx.webkit_proxy = Some(webkit);
        found
    }
}

#[async_trait]
impl FlowStrategy for DirectFlow {
    fn kind(&self) -> DebugFlow {
        DebugFlow::Direct
    }

    async fn attach(&self, ctx: &mut SessionContext, args: AttachArgs) -> Result<AttachProgress> {
        let args = ctx.initialize_settings(args)?;
        ctx.start_proxy(args.handler_kind()).await?;

        let port = if args.is_ios_webkit() {
            Self::webkit_device_port(ctx, &args).await?
        } else {
            args.port.unwrap_or(ctx.config.ports.packager)
        };

        let base = parse_base_url(&format!("{}:{port}", args.address()))?;
        let ws_url = ctx
            .resolver
            .retry_get_ws_endpoint(&base, ctx.config.discovery.attempts, &ctx.cancel)
            .await?;

        ctx.application_ws_url = Some(ws_url);
        ctx.status = DebugSessionStatus::FirstConnectionPending;
        ctx.establish_debug_session().await?;
        Ok(AttachProgress::Attached)
    }

    async fn on_app_connected(&self, ctx: &mut SessionContext, port: u16, ws_url: String) {
        tracing::debug!(session = %ctx.id, port, %ws_url, "Direct sessions do not follow reloads");
    }

    async fn on_child_terminated(&self, ctx: &mut SessionContext, child_id: &str) {
        if !is_current_child(ctx, child_id) {
            tracing::debug!(session = %ctx.id, child = child_id, "Ignoring stale child termination");
            return;
        }
        ctx.child = None;
        if !ctx.status.is_stopping() {
            ctx.terminate(false).await;
        }
    }
}
