//! Flightlog Fetcher CLI application
//!
//! Command-line interface for cataloging and downloading flight logs from a
//! flight controller's storage.

use std::process;

use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

// Import CLI modules through the library (module is public but not re-exported)
use flightlog_fetcher::cli::{
    handle_config, handle_fetch, handle_list, Cli, Commands, ProgressConfig,
};
use flightlog_fetcher::config::AppConfig;
use flightlog_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    // Cancelled or rejected selections are not failures
    if let Err(e) = result {
        if e.is_clean_exit() {
            eprintln!("{}", e);
            return;
        }
        error!(category = e.category(), "{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    if let Some(address) = &cli.global.address {
        config.connection.address = Some(address.clone());
    }
    config.validate()?;

    init_logging(&cli, &config);
    info!("Flightlog Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    let progress = ProgressConfig {
        quiet: cli.global.quiet,
        ..Default::default()
    };

    match cli.command {
        Commands::Fetch(args) => {
            info!("Executing fetch command");
            handle_fetch(args, &config, progress).await
        }
        Commands::List(args) => {
            info!("Executing list command");
            handle_list(args, &config).await
        }
        Commands::Config(args) => {
            info!("Executing config command");
            handle_config(args, &config, cli.global.config.clone(), progress).await
        }
    }
}

/// Initialize logging from CLI verbosity flags, falling back to the config file
fn init_logging(cli: &Cli, config: &AppConfig) {
    let log_level = cli.log_level().unwrap_or_else(|| config.log_level());

    let filter = EnvFilter::from_default_env().add_directive(
        format!("flightlog_fetcher={}", log_level)
            .parse()
            .unwrap_or_else(|_| LevelFilter::WARN.into()),
    );

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
