//! Runtime watcher for the classic flow
//!
//! Polls the packager's inspector endpoint and reports each new runtime
//! (first start or reload) to the session as an `AppConnected` event.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::endpoint::EndpointResolver;

use super::actor::SessionEvent;

/// Start polling `base` every `interval` until `cancel` fires
pub fn spawn_runtime_watcher(
    resolver: EndpointResolver,
    base: Url,
    interval: Duration,
    events: mpsc::WeakSender<SessionEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let port = base.port_or_known_default().unwrap_or_default();
        let mut current: Option<String> = None;

        tracing::debug!(%base, "Watching for application runtime");
        loop {
            let polled = tokio::select! {
                _ = cancel.cancelled() => break,
                polled = resolver.get_ws_endpoint(&base) => polled,
            };

            match polled {
                Ok(ws_url) if current.as_deref() != Some(ws_url.as_str()) => {
                    tracing::info!(%ws_url, "Application runtime connected");
                    current = Some(ws_url.clone());
                    let Some(events) = events.upgrade() else {
                        break;
                    };
                    if events
                        .send(SessionEvent::AppConnected { port, ws_url })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    if current.take().is_some() {
                        tracing::info!(error = %e, "Application runtime went away");
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        tracing::debug!(%base, "Runtime watcher stopped");
    })
}
