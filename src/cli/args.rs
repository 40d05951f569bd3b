//! Command-line argument parsing for Flightlog Fetcher
//!
//! This module defines the CLI structure using clap derive macros: log
//! download, catalog listing and device configuration file management.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Flightlog Fetcher - Download flight logs from a flight controller
#[derive(Parser, Debug)]
#[command(
    name = "flightlog_fetcher",
    version,
    about = "Catalog and download flight logs from a flight controller",
    long_about = "Lists the log tree on the flight controller's storage, lets you pick a log
(or takes the latest one) and downloads it, together with its key file for
encrypted logs, through a crash-safe staging directory."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// Device connection string, e.g. file:///media/sdcard
    #[arg(short, long, global = true, value_name = "ADDRESS")]
    pub address: Option<String>,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download a log and its key file
    Fetch(FetchArgs),

    /// Print the log catalog
    List(ListArgs),

    /// Manage the device configuration file
    Config(ConfigArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone, Default)]
pub struct FetchArgs {
    /// Directory receiving the downloaded files
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Download the most recent log without prompting
    #[arg(short, long)]
    pub latest: bool,

    /// Overwrite existing files without asking
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the list command
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Apply the strict date and time checks used by --latest
    #[arg(long)]
    pub strict: bool,

    /// Print the catalog as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for configuration file management
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration file actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Download the device configuration file
    Fetch {
        /// Local path for the configuration file
        #[arg(short, long, value_name = "FILE", default_value = "./config.txt")]
        file: PathBuf,

        /// Overwrite an existing local file
        #[arg(short, long)]
        force: bool,
    },

    /// Remove the device configuration file
    Remove,

    /// Write a default application config file
    Init,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested by verbosity flags, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}
