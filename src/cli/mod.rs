//! CLI command handling
//!
//! Runs the standalone subcommands and prints their results.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::commands::Commands;
use crate::common::{config::Config, Error, Result};
use crate::endpoint::{parse_base_url, EndpointResolver};
use crate::proxy::ProxyServer;

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    let config = Config::load()?;

    match command {
        Commands::Adapter => Err(Error::Internal(
            "adapter mode is handled by the binary entry point".to_string(),
        )),

        Commands::Proxy {
            host,
            port,
            handler,
        } => {
            let host = host.unwrap_or_else(|| config.proxy.host.clone());
            let port = port.unwrap_or(config.proxy.port);

            let proxy = ProxyServer::create(&host, port, handler).await?;
            proxy
                .on_connection_established(Arc::new(|target| {
                    println!("Debugger connected to {target}");
                }))
                .await;

            println!("CDP proxy listening on {}", proxy.local_addr());
            println!(
                "Point the debugger at {}",
                proxy.debugger_url("ws://<application>")?
            );
            println!("Press Ctrl-C to stop.");

            tokio::signal::ctrl_c().await?;
            proxy.stop().await;
            Ok(())
        }

        Commands::Resolve { address, attempts } => {
            let base = parse_base_url(&address)?;
            let attempts = attempts.unwrap_or(config.discovery.attempts);
            let resolver = EndpointResolver::from_config(&config.discovery)?;

            let cancel = CancellationToken::new();
            let ctrl_c = {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                })
            };

            let resolved = resolver.retry_get_ws_endpoint(&base, attempts, &cancel).await;
            ctrl_c.abort();

            println!("{}", resolved?);
            Ok(())
        }
    }
}
