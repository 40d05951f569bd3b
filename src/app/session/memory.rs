//! In-memory device tree with failure injection
//!
//! Serves the same listing and download protocol as a real device from a
//! tree held in memory. Listings keep insertion order, every request is
//! recorded, and listings or downloads can be made to fail on demand.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use futures::stream::{self, BoxStream, StreamExt};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

use super::{join_remote, remote_file_name, RemoteSession, TransferProgress};
use crate::constants::listing;
use crate::errors::{SessionError, SessionResult};

const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone)]
enum Node {
    Directory,
    File(Vec<u8>),
    /// Listing line served verbatim
    Raw(String),
}

#[derive(Debug, Default)]
struct DeviceState {
    /// (parent, name, node) in insertion order
    nodes: Vec<(String, String, Node)>,
    calls: Vec<String>,
}

impl DeviceState {
    fn find(&self, path: &str) -> Option<&Node> {
        let (parent, name) = split_remote(path);
        self.nodes
            .iter()
            .find(|(p, n, node)| p == &parent && n == name && !matches!(node, Node::Raw(_)))
            .map(|(_, _, node)| node)
    }

    fn is_directory(&self, path: &str) -> bool {
        normalize(path) == "/" || matches!(self.find(path), Some(Node::Directory))
    }

    fn insert_directory_chain(&mut self, path: &str) {
        let mut current = String::from("/");
        for segment in normalize(path).split('/').filter(|s| !s.is_empty()) {
            let child = join_remote(&current, segment);
            if self.find(&child).is_none() {
                self.nodes
                    .push((current.clone(), segment.to_string(), Node::Directory));
            }
            current = child;
        }
    }
}

/// Device file service held in memory
#[derive(Debug)]
pub struct MemorySession {
    state: Mutex<DeviceState>,
    chunk_size: usize,
    fractional: bool,
    download_failures: HashMap<String, usize>,
    listing_failures: Vec<String>,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    /// Create an empty device (only the root directory exists)
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DeviceState::default()),
            chunk_size: DEFAULT_CHUNK_SIZE,
            fractional: false,
            download_failures: HashMap::new(),
            listing_failures: Vec::new(),
        }
    }

    /// Add a directory, creating missing parents
    pub fn with_directory(mut self, path: &str) -> Self {
        self.state_mut().insert_directory_chain(path);
        self
    }

    /// Add a file, creating missing parent directories
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        let (parent, name) = split_remote(path);
        let state = self.state_mut();
        state.insert_directory_chain(&parent);
        state
            .nodes
            .push((parent, name.to_string(), Node::File(contents.into())));
        self
    }

    /// Serve an extra listing line verbatim in `directory`
    pub fn with_raw_line(mut self, directory: &str, line: &str) -> Self {
        let state = self.state_mut();
        state.insert_directory_chain(directory);
        state
            .nodes
            .push((normalize(directory), String::new(), Node::Raw(line.to_string())));
        self
    }

    /// Fail the download of `path` after `chunks` chunks were written
    pub fn with_download_failure(mut self, path: &str, chunks: usize) -> Self {
        self.download_failures.insert(normalize(path), chunks);
        self
    }

    /// Fail every listing of `path`
    pub fn with_listing_failure(mut self, path: &str) -> Self {
        self.listing_failures.push(normalize(path));
        self
    }

    /// Bytes per progress update
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Report progress as fractions instead of byte counts
    pub fn with_fractional_progress(mut self) -> Self {
        self.fractional = true;
        self
    }

    /// Requests issued so far, e.g. `"list /fs"` or `"download /fs/a.ulg"`
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Whether a file or directory exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        let state = self.state();
        state.is_directory(path) || state.find(path).is_some()
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn state_mut(&mut self) -> &mut DeviceState {
        self.state.get_mut().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, call: String) {
        self.state().calls.push(call);
    }

    fn start_copy(&self, remote_path: &str, local_dir: &Path) -> SessionResult<MemoryCopy> {
        let path = normalize(remote_path);
        self.record(format!("download {}", path));

        let data = match self.state().find(&path) {
            Some(Node::File(data)) => data.clone(),
            _ => return Err(SessionError::NotFound { path }),
        };

        Ok(MemoryCopy {
            target: local_dir.join(remote_file_name(&path)),
            fail_after: self.download_failures.get(&path).copied(),
            path,
            data,
            chunk_size: self.chunk_size,
            fractional: self.fractional,
            sent: 0,
            chunks: 0,
            created: false,
        })
    }
}

/// In-flight download from memory
struct MemoryCopy {
    path: String,
    target: PathBuf,
    data: Vec<u8>,
    chunk_size: usize,
    fractional: bool,
    fail_after: Option<usize>,
    sent: usize,
    chunks: usize,
    created: bool,
}

impl MemoryCopy {
    async fn step(&mut self) -> SessionResult<Option<TransferProgress>> {
        if !self.created {
            File::create(&self.target).await?;
            self.created = true;
        }
        if self.fail_after == Some(self.chunks) {
            return Err(SessionError::TransferInterrupted {
                path: self.path.clone(),
                reason: format!("link lost after {} bytes", self.sent),
            });
        }
        if self.sent >= self.data.len() {
            return Ok(None);
        }

        let end = (self.sent + self.chunk_size).min(self.data.len());
        let mut file = OpenOptions::new().append(true).open(&self.target).await?;
        file.write_all(&self.data[self.sent..end]).await?;
        file.flush().await?;
        self.sent = end;
        self.chunks += 1;

        let total = self.data.len() as u64;
        Ok(Some(if self.fractional {
            TransferProgress::Fraction(self.sent as f32 / total as f32)
        } else {
            TransferProgress::Bytes {
                transferred: self.sent as u64,
                total,
            }
        }))
    }
}

enum CopyState {
    Pending,
    Copying(MemoryCopy),
    Finished,
}

impl RemoteSession for MemorySession {
    async fn list_directory(&self, path: &str) -> SessionResult<Vec<String>> {
        let path = normalize(path);
        self.record(format!("list {}", path));

        if self.listing_failures.contains(&path) {
            return Err(SessionError::Rejected {
                path,
                reason: "listing failed".to_string(),
            });
        }

        let state = self.state();
        if !state.is_directory(&path) {
            return Err(SessionError::NotFound { path });
        }

        Ok(state
            .nodes
            .iter()
            .filter(|(parent, _, _)| parent == &path)
            .map(|(_, name, node)| match node {
                Node::Directory => format!("{}{}", listing::DIRECTORY_MARKER, name),
                Node::File(data) => {
                    format!("{}{}\t{}", listing::FILE_MARKER, name, data.len())
                }
                Node::Raw(line) => line.clone(),
            })
            .collect())
    }

    fn download<'a>(
        &'a self,
        remote_path: &'a str,
        local_dir: &'a Path,
    ) -> BoxStream<'a, SessionResult<TransferProgress>> {
        stream::unfold(CopyState::Pending, move |state| async move {
            let mut copy = match state {
                CopyState::Pending => match self.start_copy(remote_path, local_dir) {
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
        let path = normalize(path);
        self.record(format!("mkdir {}", path));

        let (parent, name) = split_remote(&path);
        let mut state = self.state();
        if !state.is_directory(&parent) {
            return Err(SessionError::NotFound { path: parent });
        }
        if state.find(&path).is_some() {
            return Err(SessionError::Rejected {
                path,
                reason: "already exists".to_string(),
            });
        }
        state
            .nodes
            .push((parent, name.to_string(), Node::Directory));
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> SessionResult<()> {
        let path = normalize(path);
        self.record(format!("rm {}", path));

        let (parent, name) = split_remote(&path);
        let mut state = self.state();
        let position = state.nodes.iter().position(|(p, n, node)| {
            p == &parent && n == name && matches!(node, Node::File(_))
        });
        match position {
            Some(index) => {
                state.nodes.remove(index);
                Ok(())
            }
            None => Err(SessionError::NotFound { path }),
        }
    }
}

/// Absolute remote path without trailing separator
fn normalize(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    format!("/{}", trimmed)
}

/// Split into (parent, name)
fn split_remote(path: &str) -> (String, &str) {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) => (normalize(parent), name),
        None => ("/".to_string(), trimmed),
    }
}
