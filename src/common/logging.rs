//! Logging and tracing configuration
//!
//! In adapter mode stdout carries DAP traffic, so logs go to a file (and
//! stderr for early startup problems). The CLI subcommands log to stderr.

use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use super::paths;

/// Name of the adapter log file inside the log directory
const ADAPTER_LOG_FILE: &str = "adapter.log";

/// Initialize tracing for the CLI subcommands (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rn_debugger=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for adapter mode (file + stderr logging)
///
/// Default level is TRACE for this crate so relayed CDP traffic is captured.
/// The returned guard must stay alive for the file writer to flush.
pub fn init_adapter() -> (Option<PathBuf>, Option<WorkerGuard>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rn_debugger=trace,info"));

    let log_dir = match paths::ensure_log_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Warning: Could not create log directory: {}", e);
            None
        }
    };

    if let Some(dir) = log_dir {
        let appender = tracing_appender::rolling::never(&dir, ADAPTER_LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        let file_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        // Relayed traffic goes to the file only
        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .with_filter(LevelFilter::WARN);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();

        return (Some(dir.join(ADAPTER_LOG_FILE)), Some(guard));
    }

    // Fallback: stderr only
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    (None, None)
}
