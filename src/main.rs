mod api;
mod cli;
mod config;
mod db;
mod embedding;
mod error;
mod memory;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "engram", version, about = "Semantic memory service for AI chat")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP memory server
    Serve,
    /// Search memories from the terminal
    Search {
        /// Natural language query
        query: String,
        /// User whose memories to search (defaults to the configured user)
        #[arg(long)]
        user: Option<String>,
    },
    /// Show memory store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = config::EngramConfig::load()?;

    // Initialize tracing with the configured log level, on stderr so stdout
    // stays clean for CLI output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve(config).await?;
        }
        Command::Search { query, user } => {
            cli::search::search(&config, &query, user.as_deref()).await?;
        }
        Command::Stats => {
            cli::stats::stats(&config)?;
        }
    }

    Ok(())
}
