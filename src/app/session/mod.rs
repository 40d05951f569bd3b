//! Remote session abstraction for the device file service
//!
//! The device exposes a minimal, stateless service: flat directory listings,
//! whole-file downloads with progress, directory creation and file removal.
//! Everything above this module talks to the device through [`RemoteSession`].
//!
//! The module is organized into:
//! - `mounted`: a session serving a locally mounted copy of the device storage
//! - `memory`: an in-memory device tree with failure injection

use std::path::{Path, PathBuf};

use futures::stream::BoxStream;
use url::Url;

use crate::errors::{SessionError, SessionResult};

pub mod memory;
pub mod mounted;

pub use memory::MemorySession;
pub use mounted::MountedSession;

/// One progress update from an in-flight download
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransferProgress {
    /// Byte counts, as reported for log transfers
    Bytes { transferred: u64, total: u64 },
    /// Completed fraction in `[0, 1]`, as reported for small file transfers
    Fraction(f32),
}

impl TransferProgress {
    /// Rounded completion percentage
    pub fn percent(&self) -> u8 {
        let ratio = match *self {
            TransferProgress::Bytes { total: 0, .. } => 1.0,
            TransferProgress::Bytes { transferred, total } => transferred as f64 / total as f64,
            TransferProgress::Fraction(fraction) => f64::from(fraction),
        };
        (ratio.clamp(0.0, 1.0) * 100.0).round() as u8
    }
}

/// File service of a connected device
///
/// Calls are issued strictly one at a time; implementations are not required
/// to support overlapping requests.
#[allow(async_fn_in_trait)]
pub trait RemoteSession {
    /// List a remote directory as raw `D<name>` / `F<name>\t<size>` lines
    async fn list_directory(&self, path: &str) -> SessionResult<Vec<String>>;

    /// Download `remote_path` into `local_dir`, keeping the remote file name
    ///
    /// The returned stream yields progress until the transfer completes and
    /// ends with an `Err` item if the transfer fails.
    fn download<'a>(
        &'a self,
        remote_path: &'a str,
        local_dir: &'a Path,
    ) -> BoxStream<'a, SessionResult<TransferProgress>>;

    /// Create a remote directory
    async fn create_directory(&self, path: &str) -> SessionResult<()>;

    /// Remove a remote file
    async fn remove_file(&self, path: &str) -> SessionResult<()>;
}

/// Join a remote directory path and a child name
pub fn join_remote(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    format!("{}/{}", base, name)
}

/// Last segment of a remote path
pub fn remote_file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Resolve a connection string to the mount point it refers to
///
/// Accepts `file:///abs/path` URLs and bare local paths. Radio and serial
/// transports are recognised and rejected.
pub fn resolve_mount_address(address: &str) -> SessionResult<PathBuf> {
    const LINK_SCHEMES: [&str; 3] = ["udp", "tcp", "serial"];

    let unsupported = |reason: &str| SessionError::UnsupportedAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if let Some((scheme, _)) = address.split_once(':') {
        let scheme = scheme.to_ascii_lowercase();
        if LINK_SCHEMES.contains(&scheme.as_str()) {
            return Err(unsupported(
                "only mounted device storage (file://) is supported by this build",
            ));
        }
        if scheme == "file" {
            let url = Url::parse(address).map_err(|e| unsupported(&e.to_string()))?;
            return url
                .to_file_path()
                .map_err(|_| unsupported("file URL must hold an absolute local path"));
        }
    }

    if address.trim().is_empty() {
        return Err(unsupported("address is empty"));
    }

    Ok(PathBuf::from(address))
}

/// Open a session for a connection string
pub async fn connect(address: &str) -> SessionResult<MountedSession> {
    let mount = resolve_mount_address(address)?;
    MountedSession::open(mount).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_from_bytes() {
        let progress = TransferProgress::Bytes {
            transferred: 1,
            total: 3,
        };
        assert_eq!(progress.percent(), 33);

        let done = TransferProgress::Bytes {
            transferred: 10,
            total: 10,
        };
        assert_eq!(done.percent(), 100);
    }

    #[test]
    fn test_percent_rounds_half_up() {
        let progress = TransferProgress::Bytes {
            transferred: 1,
            total: 200,
        };
        assert_eq!(progress.percent(), 1);
    }

    #[test]
    fn test_percent_empty_file_is_complete() {
        let progress = TransferProgress::Bytes {
            transferred: 0,
            total: 0,
        };
        assert_eq!(progress.percent(), 100);
    }

    #[test]
    fn test_percent_from_fraction() {
        assert_eq!(TransferProgress::Fraction(0.254).percent(), 25);
        assert_eq!(TransferProgress::Fraction(1.5).percent(), 100);
    }

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("/fs/microsd", "log"), "/fs/microsd/log");
        assert_eq!(join_remote("/", "fs"), "/fs");
        assert_eq!(join_remote("/fs/microsd/", "/log"), "/fs/microsd/log");
    }

    #[test]
    fn test_remote_file_name() {
        assert_eq!(
            remote_file_name("/fs/microsd/log/2024-05-01/14_03_22.ulg"),
            "14_03_22.ulg"
        );
        assert_eq!(remote_file_name("config.txt"), "config.txt");
    }

    #[test]
    fn test_resolve_mount_address() {
        let path = resolve_mount_address("/media/sdcard").unwrap();
        assert_eq!(path, PathBuf::from("/media/sdcard"));

        #[cfg(unix)]
        {
            let path = resolve_mount_address("file:///media/sdcard").unwrap();
            assert_eq!(path, PathBuf::from("/media/sdcard"));
        }
    }

    #[test]
    fn test_resolve_rejects_link_transports() {
        for address in ["udp://:14540", "tcp:127.0.0.1:5760", "serial:///dev/ttyACM0"] {
            let result = resolve_mount_address(address);
            assert!(
                matches!(result, Err(SessionError::UnsupportedAddress { .. })),
                "{} should be rejected",
                address
            );
        }
    }
}
