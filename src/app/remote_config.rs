//! Device configuration file operations
//!
//! These are the only callers allowed to create directories on the device:
//! the configuration directory under the storage root is created on demand,
//! the storage root itself never is.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::app::layout::RemoteLayout;
use crate::app::listing::contains_file;
use crate::app::remote_dir::RemoteDirectoryValidator;
use crate::app::session::RemoteSession;
use crate::app::transfer::{stage_and_relocate, TransferConfig, TransferReporter};
use crate::constants::remote;
use crate::errors::{CatalogError, Result, TransferError};

/// Outcome of [`fetch_config`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigFileStatus {
    /// No configuration file on the device
    Missing,
    /// Configuration file written to this path
    Fetched(PathBuf),
}

/// Prepare the configuration directory and report whether the file is listed
async fn prepare_config_dir<S: RemoteSession>(session: &S, layout: &RemoteLayout) -> Result<bool> {
    let validator = RemoteDirectoryValidator::new(session);

    if !validator.exists(&layout.storage_root).await? {
        return Err(CatalogError::RootNotFound {
            path: layout.storage_root.clone(),
            hint: remote::STORAGE_HINT.to_string(),
        }
        .into());
    }

    let config_dir = layout.config_dir_path();
    if validator.ensure(&config_dir).await? {
        return Ok(false);
    }

    let listing = session.list_directory(&config_dir).await?;
    Ok(contains_file(&listing, &layout.config_file))
}

/// Download the device configuration file to `local_path`
///
/// The file is staged next to `local_path` and renamed into place once the
/// transfer completed.
pub async fn fetch_config<S: RemoteSession>(
    session: &S,
    layout: &RemoteLayout,
    local_path: &Path,
    overwrite: bool,
    reporter: &mut dyn TransferReporter,
) -> Result<ConfigFileStatus> {
    if !prepare_config_dir(session, layout).await? {
        info!("No configuration file at {}", layout.config_file_path());
        return Ok(ConfigFileStatus::Missing);
    }

    if local_path.exists() && !overwrite {
        return Err(TransferError::OutputExists {
            path: local_path.to_path_buf(),
        }
        .into());
    }

    let parent = match local_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await?;

    let staging = TransferConfig::default()
        .with_staging_parent(&parent)
        .staging_dir()?;
    let remote_path = layout.config_file_path();
    let output = stage_and_relocate(
        session,
        &remote_path,
        staging.path(),
        |_| local_path.to_path_buf(),
        overwrite,
        reporter,
    )
    .await?;
    staging.close()?;

    Ok(ConfigFileStatus::Fetched(output))
}

/// Remove the device configuration file
///
/// Returns `true` if a file was removed.
pub async fn remove_config<S: RemoteSession>(session: &S, layout: &RemoteLayout) -> Result<bool> {
    if !prepare_config_dir(session, layout).await? {
        info!("No configuration file at {}", layout.config_file_path());
        return Ok(false);
    }

    let path = layout.config_file_path();
    info!("Remove file from device path: '{}'", path);
    session.remove_file(&path).await?;
    Ok(true)
}
