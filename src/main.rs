//! React Native debugger - CDP proxy and debug adapter for React Native apps
//!
//! Without a subcommand the binary runs as a debug adapter on stdio, which
//! is how the IDE starts it.

use clap::Parser;
use commands::Commands;
use rn_debugger::{adapter, cli, commands, common::logging};

#[derive(Parser)]
#[command(name = "rn-debugger", about = "React Native debugging proxy and adapter")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command.unwrap_or(Commands::Adapter) {
        Commands::Adapter => {
            let (log_file, _guard) = logging::init_adapter();
            if let Some(path) = log_file {
                tracing::info!(path = %path.display(), "Logging to file");
            }
            adapter::run().await
        }
        command => {
            logging::init_cli();
            cli::dispatch(command).await
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
