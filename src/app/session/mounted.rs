//! Session backed by a locally mounted copy of the device storage
//!
//! The device's SD card can be read on a workstation, and the `simulate`
//! binary produces the same tree. This session serves such a directory with
//! the device's listing format and chunked, progress-reporting downloads.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info};

use super::{remote_file_name, RemoteSession, TransferProgress};
use crate::constants::{files, listing};
use crate::errors::{SessionError, SessionResult};

/// Session over a mounted device tree
#[derive(Debug, Clone)]
pub struct MountedSession {
    mount: PathBuf,
    chunk_size: usize,
}

impl MountedSession {
    /// Open a session rooted at `mount`
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the mount point is not a directory
    pub async fn open(mount: impl Into<PathBuf>) -> SessionResult<Self> {
        let mount = mount.into();
        let is_dir = fs::metadata(&mount)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(SessionError::NotFound {
                path: mount.display().to_string(),
            });
        }

        info!("Connected to device storage at {}", mount.display());
        Ok(Self {
            mount,
            chunk_size: files::COPY_CHUNK_SIZE,
        })
    }

    /// Set the download chunk size (one progress update per chunk)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Mount point of this session
    pub fn mount(&self) -> &Path {
        &self.mount
    }

    /// Map a remote path onto the mount, refusing escapes
    fn local_path(&self, remote_path: &str) -> SessionResult<PathBuf> {
        let relative = Path::new(remote_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SessionError::Rejected {
                path: remote_path.to_string(),
                reason: "path leaves the device storage".to_string(),
            });
        }
        Ok(self.mount.join(relative))
    }

    async fn open_copy(&self, remote_path: &str, local_dir: &Path) -> SessionResult<ChunkedCopy> {
        let source_path = self.local_path(remote_path)?;
        let source = File::open(&source_path)
            .await
            .map_err(|e| map_io(remote_path, e))?;
        let total = source.metadata().await?.len();
        let target = File::create(local_dir.join(remote_file_name(remote_path))).await?;

        debug!("Copying {} ({} bytes)", remote_path, total);
        Ok(ChunkedCopy {
            source,
            target,
            buffer: vec![0; self.chunk_size],
            transferred: 0,
            total,
        })
    }
}

/// In-flight copy of one file
struct ChunkedCopy {
    source: File,
    target: File,
    buffer: Vec<u8>,
    transferred: u64,
    total: u64,
}

impl ChunkedCopy {
    /// Copy one chunk; `None` once the source is exhausted
    async fn step(&mut self) -> SessionResult<Option<TransferProgress>> {
        let read = self.source.read(&mut self.buffer).await?;
        if read == 0 {
            self.target.flush().await?;
            self.target.sync_all().await?;
            return Ok(None);
        }

        self.target.write_all(&self.buffer[..read]).await?;
        self.transferred += read as u64;
        Ok(Some(TransferProgress::Bytes {
            transferred: self.transferred,
            total: self.total.max(self.transferred),
        }))
    }
}

enum CopyState {
    Pending,
    Copying(ChunkedCopy),
    Finished,
}

fn map_io(path: &str, error: std::io::Error) -> SessionError {
    if error.kind() == ErrorKind::NotFound {
        SessionError::NotFound {
            path: path.to_string(),
        }
    } else {
        SessionError::Io(error)
    }
}

impl RemoteSession for MountedSession {
    async fn list_directory(&self, path: &str) -> SessionResult<Vec<String>> {
        let local = self.local_path(path)?;
        let mut reader = fs::read_dir(&local).await.map_err(|e| map_io(path, e))?;

        let mut lines = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                lines.push(format!("{}{}", listing::DIRECTORY_MARKER, name));
            } else if meta.is_file() {
                lines.push(format!("{}{}\t{}", listing::FILE_MARKER, name, meta.len()));
            }
        }
        // read_dir order is platform dependent
        lines.sort();

        debug!("Listed {}: {} entries", path, lines.len());
        Ok(lines)
    }

    fn download<'a>(
        &'a self,
        remote_path: &'a str,
        local_dir: &'a Path,
    ) -> BoxStream<'a, SessionResult<TransferProgress>> {
        stream::unfold(CopyState::Pending, move |state| async move {
            let mut copy = match state {
                CopyState::Pending => match self.open_copy(remote_path, local_dir).await {
                    Ok(copy) => copy,
                    Err(e) => return Some((Err(e), CopyState::Finished)),
                },
                CopyState::Copying(copy) => copy,
                CopyState::Finished => return None,
            };

            match copy.step().await {
                Ok(Some(progress)) => Some((Ok(progress), CopyState::Copying(copy))),
                Ok(None) => None,
                Err(e) => Some((Err(e), CopyState::Finished)),
            }
        })
        .boxed()
    }

    async fn create_directory(&self, path: &str) -> SessionResult<()> {
        let local = self.local_path(path)?;
        fs::create_dir(&local).await.map_err(|e| map_io(path, e))?;
        info!("Created remote directory {}", path);
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> SessionResult<()> {
        let local = self.local_path(path)?;
        fs::remove_file(&local).await.map_err(|e| map_io(path, e))?;
        info!("Removed remote file {}", path);
        Ok(())
    }
}
