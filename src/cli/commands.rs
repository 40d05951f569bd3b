//! Command handlers for Flightlog Fetcher CLI
//!
//! This module implements the command handlers that coordinate between CLI
//! arguments and the core application functionality. Each command has a
//! session-generic core (`fetch_log`, `list_logs`, ...) and a `handle_*`
//! wrapper that opens the device session and wires up terminal I/O.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::app::catalog::{CatalogBuilder, CatalogMode, LogEntry};
use crate::app::layout::RemoteLayout;
use crate::app::remote_config::{fetch_config, remove_config, ConfigFileStatus};
use crate::app::selector::{render_listing, select_interactive, select_latest};
use crate::app::session::{connect, RemoteSession};
use crate::app::transfer::{TransferPipeline, TransferReporter};
use crate::cli::args::{ConfigAction, ConfigArgs, FetchArgs, ListArgs};
use crate::cli::progress::{ProgressConfig, ProgressDisplay};
use crate::cli::prompt::{confirm, Prompt, TerminalPrompt};
use crate::config::AppConfig;
use crate::errors::{AppError, Result, SelectionError};

const SELECT_MESSAGE: &str = "\nSelect log file to download: ";
const OVERWRITE_MESSAGE: &str = "File already exists, override? (Y/n) ";

/// Handle the fetch command
pub async fn handle_fetch(args: FetchArgs, config: &AppConfig, progress: ProgressConfig) -> Result<()> {
    let session = connect(config.address()?).await?;
    let mut display = ProgressDisplay::new(progress);

    let outputs = fetch_log(&session, config, &args, &mut TerminalPrompt, &mut display).await?;
    info!("Fetched {} file(s)", outputs.len());
    Ok(())
}

/// Catalog the device, select one entry and download it
///
/// Returns the written files, data file first. Declining the overwrite
/// question returns an empty list.
pub async fn fetch_log<S: RemoteSession>(
    session: &S,
    config: &AppConfig,
    args: &FetchArgs,
    prompt: &mut dyn Prompt,
    reporter: &mut dyn TransferReporter,
) -> Result<Vec<PathBuf>> {
    let mode = if args.latest {
        CatalogMode::Latest
    } else {
        CatalogMode::Interactive
    };
    let catalog = CatalogBuilder::new(session, &config.remote, mode)
        .build()
        .await?;

    let entry = if args.latest {
        let entry = select_latest(catalog.entries())?;
        println!("latest:");
        println!("{}", entry.display_name());
        entry
    } else {
        choose_entry(catalog.entries(), prompt)?
    };

    let mut transfer = config.transfer_config(args.force);
    if let Some(dir) = &args.dir {
        transfer.output_dir = dir.clone();
    }
    let mut pipeline = TransferPipeline::new(session, transfer.clone());

    if !args.force {
        let destinations = pipeline.destinations(entry)?;
        if let Some((_, existing)) = destinations.iter().find(|(_, path)| path.exists()) {
            info!("Output {} already exists", existing.display());
            if !confirm(prompt, OVERWRITE_MESSAGE)? {
                println!("Skipped {}", entry.display_name());
                return Ok(Vec::new());
            }
            pipeline = TransferPipeline::new(session, transfer.with_overwrite(true));
        }
    }

    Ok(pipeline.download(entry, reporter).await?)
}

/// Print the numbered listing and read the operator's choice
fn choose_entry<'a>(entries: &'a [LogEntry], prompt: &mut dyn Prompt) -> Result<&'a LogEntry> {
    if entries.is_empty() {
        return Err(SelectionError::NoEntries.into());
    }

    println!("logs:");
    for line in render_listing(entries) {
        println!("{}", line);
    }

    let input = prompt.ask(SELECT_MESSAGE)?;
    let index = select_interactive(entries, &input)?;
    Ok(&entries[index])
}

/// Handle the list command
pub async fn handle_list(args: ListArgs, config: &AppConfig) -> Result<()> {
    let session = connect(config.address()?).await?;
    println!("{}", list_logs(&session, &config.remote, &args).await?);
    Ok(())
}

/// Render the catalog as text or JSON
pub async fn list_logs<S: RemoteSession>(
    session: &S,
    layout: &RemoteLayout,
    args: &ListArgs,
) -> Result<String> {
    let mode = if args.strict {
        CatalogMode::Latest
    } else {
        CatalogMode::Interactive
    };
    let catalog = CatalogBuilder::new(session, layout, mode).build().await?;

    if args.json {
        return Ok(serde_json::to_string_pretty(catalog.entries())?);
    }
    if catalog.is_empty() {
        return Ok(SelectionError::NoEntries.to_string());
    }
    Ok(render_listing(catalog.entries()).join("\n"))
}

/// Handle configuration file commands
pub async fn handle_config(
    args: ConfigArgs,
    config: &AppConfig,
    config_path: Option<PathBuf>,
    progress: ProgressConfig,
) -> Result<()> {
    match args.action {
        ConfigAction::Init => {
            let path = config_path
                .or_else(AppConfig::default_config_path)
                .ok_or_else(|| AppError::generic("Could not determine user config directory"))?;
            init_app_config(&path).await
        }
        ConfigAction::Fetch { file, force } => {
            let session = connect(config.address()?).await?;
            let mut display = ProgressDisplay::new(progress);
            fetch_device_config(
                &session,
                &config.remote,
                &file,
                force,
                &mut TerminalPrompt,
                &mut display,
            )
            .await
            .map(|_| ())
        }
        ConfigAction::Remove => {
            let session = connect(config.address()?).await?;
            remove_device_config(&session, &config.remote).await.map(|_| ())
        }
    }
}

async fn init_app_config(path: &Path) -> Result<()> {
    if AppConfig::write_default_file(path).await? {
        println!("Created default configuration file:");
        println!("   {}", path.display());
        println!("   You can customize settings by editing this file.");
    } else {
        println!("Configuration file already exists: {}", path.display());
    }
    Ok(())
}

/// Download the device configuration file, asking before overwriting
///
/// Returns `None` when the operator declined to overwrite `file`.
pub async fn fetch_device_config<S: RemoteSession>(
    session: &S,
    layout: &RemoteLayout,
    file: &Path,
    force: bool,
    prompt: &mut dyn Prompt,
    reporter: &mut dyn TransferReporter,
) -> Result<Option<ConfigFileStatus>> {
    let mut overwrite = force;
    if !overwrite && file.exists() {
        if !confirm(prompt, OVERWRITE_MESSAGE)? {
            println!("Skipped {}", file.display());
            return Ok(None);
        }
        overwrite = true;
    }

    let status = fetch_config(session, layout, file, overwrite, reporter).await?;
    match &status {
        ConfigFileStatus::Fetched(path) => {
            println!("Config file downloaded: '{}'", path.display())
        }
        ConfigFileStatus::Missing => println!("No config file found on the device"),
    }
    Ok(Some(status))
}

/// Remove the device configuration file
pub async fn remove_device_config<S: RemoteSession>(
    session: &S,
    layout: &RemoteLayout,
) -> Result<bool> {
    let removed = remove_config(session, layout).await?;
    if removed {
        println!("Removed '{}' from the device", layout.config_file_path());
    } else {
        println!("No config file found on the device");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::session::MemorySession;
    use crate::app::transfer::SilentReporter;
    use crate::cli::prompt::ScriptedPrompt;
    use tempfile::TempDir;

    fn device() -> MemorySession {
        MemorySession::new()
            .with_file("/fs/microsd/log/2024-05-01/14_03_22.ulg", vec![1u8; 100])
            .with_file("/fs/microsd/log/2024-05-02/09_00_00.ulgc", vec![2u8; 200])
            .with_file("/fs/microsd/log/2024-05-02/09_00_00.ulgk", vec![3u8; 16])
    }

    fn config_for(output: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.transfer.output_dir = output.path().to_path_buf();
        config.transfer.staging_dir = output.path().to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_fetch_latest_downloads_pair() {
        let output = TempDir::new().unwrap();
        let args = FetchArgs {
            latest: true,
            ..Default::default()
        };

        let files = fetch_log(
            &device(),
            &config_for(&output),
            &args,
            &mut ScriptedPrompt::default(),
            &mut SilentReporter,
        )
        .await
        .unwrap();

        assert_eq!(
            files,
            vec![
                output.path().join("log-2024-05-02T09-00-00Z.ulgc"),
                output.path().join("log-2024-05-02T09-00-00Z.ulgk"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_interactive_selection() {
        let output = TempDir::new().unwrap();
        let mut prompt = ScriptedPrompt::new(["0\n"]);

        let files = fetch_log(
            &device(),
            &config_for(&output),
            &FetchArgs::default(),
            &mut prompt,
            &mut SilentReporter,
        )
        .await
        .unwrap();

        assert_eq!(files, vec![output.path().join("log-2024-05-01T14-03-22Z.ulg")]);
        assert_eq!(prompt.asked(), [SELECT_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_cancel_is_clean_exit() {
        let output = TempDir::new().unwrap();

        for answer in ["\n", "7", "x"] {
            let result = fetch_log(
                &device(),
                &config_for(&output),
                &FetchArgs::default(),
                &mut ScriptedPrompt::new([answer]),
                &mut SilentReporter,
            )
            .await;

            let err = result.unwrap_err();
            assert!(err.is_clean_exit(), "{:?} should exit cleanly", answer);
        }
        assert_eq!(std::fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_declined_overwrite() {
        let output = TempDir::new().unwrap();
        let existing = output.path().join("log-2024-05-01T14-03-22Z.ulg");
        std::fs::write(&existing, b"old").unwrap();
        let session = device();

        let files = fetch_log(
            &session,
            &config_for(&output),
            &FetchArgs::default(),
            &mut ScriptedPrompt::new(["0", "n"]),
            &mut SilentReporter,
        )
        .await
        .unwrap();

        assert!(files.is_empty());
        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
        assert!(!session.calls().iter().any(|c| c.starts_with("download")));
    }

    #[tokio::test]
    async fn test_fetch_accepted_overwrite() {
        let output = TempDir::new().unwrap();
        let existing = output.path().join("log-2024-05-01T14-03-22Z.ulg");
        std::fs::write(&existing, b"old").unwrap();

        fetch_log(
            &device(),
            &config_for(&output),
            &FetchArgs::default(),
            &mut ScriptedPrompt::new(["0", ""]),
            &mut SilentReporter,
        )
        .await
        .unwrap();

        assert_eq!(std::fs::read(&existing).unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_fetch_dir_flag_overrides_config() {
        let output = TempDir::new().unwrap();
        let args = FetchArgs {
            dir: Some(output.path().join("flight")),
            latest: true,
            force: false,
        };

        let files = fetch_log(
            &device(),
            &config_for(&output),
            &args,
            &mut ScriptedPrompt::default(),
            &mut SilentReporter,
        )
        .await
        .unwrap();

        assert!(files.iter().all(|f| f.starts_with(output.path().join("flight"))));
    }

    #[tokio::test]
    async fn test_list_logs_text_and_json() {
        let session = device();
        let layout = RemoteLayout::default();

        let text = list_logs(&session, &layout, &ListArgs::default()).await.unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("(encrypted)"));

        let json = list_logs(
            &session,
            &layout,
            &ListArgs {
                json: true,
                strict: false,
            },
        )
        .await
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
        assert_eq!(parsed[1]["encrypted"], serde_json::Value::Bool(true));
    }

    #[tokio::test]
    async fn test_list_logs_empty() {
        let session = MemorySession::new().with_directory("/fs/microsd/log");
        let text = list_logs(&session, &RemoteLayout::default(), &ListArgs::default())
            .await
            .unwrap();
        assert_eq!(text, "No log files found");
    }

    #[tokio::test]
    async fn test_fetch_device_config_declined() {
        let local = TempDir::new().unwrap();
        let file = local.path().join("config.txt");
        std::fs::write(&file, "old").unwrap();
        let session = MemorySession::new().with_file("/fs/microsd/etc/config.txt", "new");

        let status = fetch_device_config(
            &session,
            &RemoteLayout::default(),
            &file,
            false,
            &mut ScriptedPrompt::new(["n"]),
            &mut SilentReporter,
        )
        .await
        .unwrap();

        assert_eq!(status, None);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "old");
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_device_config() {
        let session = MemorySession::new().with_file("/fs/microsd/etc/config.txt", "x");
        assert!(remove_device_config(&session, &RemoteLayout::default())
            .await
            .unwrap());
    }
}
