//! DAP adapter hosting React Native debug sessions
//!
//! This is the entry point when the IDE starts the binary. DAP traffic uses
//! stdin/stdout, so nothing here may print to stdout.

pub mod handler;
pub mod host;
pub mod server;

use std::sync::Arc;

use tokio::io::BufReader;

use crate::common::{config::Config, Result};
use crate::session::{CommandLauncher, SessionRegistry};

pub use host::DapHost;
pub use server::{serve, DapSender};

/// Run the adapter on stdio until the IDE disconnects or we are signalled
pub async fn run() -> Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = std::process::id(),
        "Starting React Native debug adapter"
    );

    let config = Arc::new(Config::load()?);
    let launcher = Arc::new(CommandLauncher::new(config.launch.clone()));
    let registry = Arc::new(SessionRegistry::new(config, launcher));

    let reader = BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    tokio::select! {
        served = serve(reader, writer, registry.clone()) => served,
        _ = shutdown_signal() => {
            registry.disconnect_all(false).await;
            Ok(())
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot install SIGTERM handler");
            std::future::pending::<()>().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down"),
        _ = tokio::signal::ctrl_c() => tracing::info!("Received SIGINT, shutting down"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl-C, shutting down");
    }
}
