//! # warden-cli
//!
//! Command-line interface for Warden access control.
//!
//! - `warden replay <scenario.yaml>` — run a scripted scenario against a fresh system
//! - `warden verify <journal.jsonl>` — check an exported journal's hash chain
//! - `warden config` — print the effective configuration

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Warden: policy, reputation and quorum-gated access control.
#[derive(Parser)]
#[command(name = "warden", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a YAML scenario and print each result.
    Replay {
        /// Scenario file (members + steps).
        scenario: PathBuf,
        /// Configuration file (defaults built in).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Export the resulting journal as JSONL.
        #[arg(long)]
        journal: Option<PathBuf>,
        /// Print one JSON object per step instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Verify an exported journal's hash chain.
    Verify {
        /// Journal file written by `replay --journal`.
        journal: PathBuf,
    },
    /// Validate and print the effective configuration as TOML.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable. The `warden`
    // directive covers every warden_* target.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warden=info".parse()?))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Commands::Replay {
            scenario,
            config,
            journal,
            json,
        } => commands::replay::execute(scenario, config.as_deref(), journal.as_deref(), *json),
        Commands::Verify { journal } => commands::verify::execute(journal),
        Commands::Config { config } => commands::config::execute(config.as_deref()),
    }
}
