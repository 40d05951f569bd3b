//! Remote directory chain validation
//!
//! The device has no "stat" request, so existence of a directory is proven by
//! walking from the root and finding each segment in its parent's listing.

use tracing::{debug, info};

use crate::app::listing::contains_directory;
use crate::app::session::{join_remote, RemoteSession};
use crate::constants::remote;
use crate::errors::SessionResult;

/// Walks remote paths segment by segment
pub struct RemoteDirectoryValidator<'a, S> {
    session: &'a S,
}

impl<'a, S: RemoteSession> RemoteDirectoryValidator<'a, S> {
    pub fn new(session: &'a S) -> Self {
        Self { session }
    }

    /// Whether every segment of `path` exists as a directory
    ///
    /// Read-only: returns `false` at the first missing segment.
    pub async fn exists(&self, path: &str) -> SessionResult<bool> {
        let mut current = remote::ROOT.to_string();

        for segment in path_segments(path) {
            let listing = self.session.list_directory(&current).await?;
            if !contains_directory(&listing, segment) {
                debug!("Segment '{}' missing under {}", segment, current);
                return Ok(false);
            }
            current = join_remote(&current, segment);
        }

        Ok(true)
    }

    /// Create `path` if it does not exist
    ///
    /// Only for directories the operator is allowed to create; the storage
    /// mount itself must never be created this way. Returns `true` when a
    /// directory was created.
    pub async fn ensure(&self, path: &str) -> SessionResult<bool> {
        if self.exists(path).await? {
            return Ok(false);
        }

        info!("Directory {} missing, creating..", path);
        self.session.create_directory(path).await?;
        Ok(true)
    }
}

/// Segments of a path with leading and trailing separators stripped
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.trim_matches(remote::SEPARATOR)
        .split(remote::SEPARATOR)
        .filter(|segment| !segment.is_empty())
}
