// src/cli.rs
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ct-roots: accepted-roots store for Certificate Transparency logs
///
/// Polls every known CT log's get-roots endpoint and keeps a
/// content-addressed store of the root lists they accept.
#[derive(Parser, Debug, Clone)]
#[command(name = "ct-roots")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to TOML config file
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Override the store directory from config
    #[arg(long = "store-dir", global = true)]
    pub store_dir: Option<PathBuf>,

    /// Verbose logging (set log level to debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    /// Quiet logging (set log level to warn)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Disable progress bar
    #[arg(long = "no-progress", global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Download accepted roots from every log and rebuild the store
    Fetch {
        /// Log list URL or file; repeatable, replaces the configured sources
        #[arg(short = 's', long = "source")]
        sources: Vec<String>,

        /// Override the maximum number of concurrent requests
        #[arg(long = "max-in-flight")]
        max_in_flight: Option<usize>,
    },
    /// Load the store and print each log's accepted roots
    List,
}

/// Config file used when `--config` is not given; optional on disk
pub const DEFAULT_CONFIG_PATH: &str = "ct-roots.toml";

impl Cli {
    /// Validate flag combinations and return errors for invalid usage
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.verbose && self.quiet {
            anyhow::bail!("Cannot specify both --verbose and --quiet");
        }

        if let Command::Fetch {
            max_in_flight: Some(0),
            ..
        } = self.command
        {
            anyhow::bail!("--max-in-flight must be greater than 0");
        }

        Ok(())
    }

    /// Determine log level override from verbose/quiet flags
    pub fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("warn")
        } else {
            None
        }
    }

    pub fn should_show_progress(&self) -> bool {
        !self.no_progress && !self.quiet
    }
}
