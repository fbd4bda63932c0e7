use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod reader;

#[derive(Parser)]
#[command(version, about = "SWTOR combat log pipeline host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a combat log file and report per-stream statistics
    Parse {
        path: PathBuf,
        /// Skip NTP synchronization and run on the host clock
        #[arg(long)]
        no_sync: bool,
    },
    /// Query the configured NTP servers and print the measured offset
    Sync,
    /// Show the persisted configuration
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let cfg = config::HostConfig::load()?;

    match cli.command {
        Commands::Parse { path, no_sync } => commands::parse_file(&cfg, &path, no_sync),
        Commands::Sync => commands::sync_clock(&cfg),
        Commands::Config => commands::show_config(&cfg),
    }
}
