//! CLI for the feedloop event consumer.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use feedloop_core::config;
use std::path::PathBuf;

use commands::{run_replay, show_config};

/// Top-level CLI for the feedloop event consumer.
#[derive(Debug, Parser)]
#[command(name = "feedloop")]
#[command(about = "Resumable long-poll event feed consumer", long_about = None)]
pub struct Cli {
    /// Read configuration from this file instead of the XDG config dir.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the feed loop over a scripted feed (JSON) and print delivered events.
    Replay {
        /// Path to the feed script.
        script: PathBuf,

        /// Retry immediately instead of using the configured backoff.
        #[arg(long)]
        no_backoff: bool,
    },

    /// Show the config file path and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = match &cli.config {
            Some(path) => config::load_from_path(path)?,
            None => config::load_or_init()?,
        };
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Replay { script, no_backoff } => {
                run_replay(&cfg, &script, no_backoff).await?
            }
            CliCommand::Config => show_config(&cfg, cli.config.as_deref())?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
