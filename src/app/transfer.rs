//! Staged downloads with atomic relocation
//!
//! Every transfer lands in a scoped staging directory first. Only when the
//! stream has completed and exactly one file sits in the staging directory is
//! that file renamed into the output directory, so the output directory never
//! holds a partial file. The staging directory is removed on every exit path.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::app::catalog::LogEntry;
use crate::app::naming::output_file_name;
use crate::app::session::{remote_file_name, RemoteSession};
use crate::constants::files;
use crate::errors::{TransferError, TransferResult};

/// Progress notifications from a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// A remote file started downloading
    Started { remote_path: String },
    /// Rounded completion percentage changed
    Progress { percent: u8 },
    /// The file was relocated to its final path
    Completed { output: PathBuf },
}

/// Receives [`TransferEvent`]s
pub trait TransferReporter {
    fn report(&mut self, event: TransferEvent);
}

impl<F: FnMut(TransferEvent)> TransferReporter for F {
    fn report(&mut self, event: TransferEvent) {
        self(event)
    }
}

/// Reporter that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl TransferReporter for SilentReporter {
    fn report(&mut self, _event: TransferEvent) {}
}

/// Suppresses repeated percentages
#[derive(Debug, Default)]
pub struct PercentTracker {
    last: Option<u8>,
}

impl PercentTracker {
    /// `Some(percent)` only when it differs from the previous value
    pub fn update(&mut self, percent: u8) -> Option<u8> {
        if self.last == Some(percent) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

/// Settings for [`TransferPipeline`]
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Directory receiving the final files
    pub output_dir: PathBuf,
    /// Directory in which staging directories are created
    ///
    /// Must be on the same filesystem as `output_dir`: finished files are
    /// moved with a rename, which fails across devices.
    pub staging_parent: PathBuf,
    /// Name prefix of staging directories
    pub staging_prefix: String,
    /// Replace existing output files
    pub overwrite: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            staging_parent: PathBuf::from("."),
            staging_prefix: files::STAGING_PREFIX.to_string(),
            overwrite: false,
        }
    }
}

impl TransferConfig {
    /// Configuration writing into `output_dir`
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the staging parent directory
    pub fn with_staging_parent(mut self, staging_parent: impl Into<PathBuf>) -> Self {
        self.staging_parent = staging_parent.into();
        self
    }

    /// Allow replacing existing output files
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Create a fresh staging directory
    pub fn staging_dir(&self) -> TransferResult<tempfile::TempDir> {
        let staging = tempfile::Builder::new()
            .prefix(&self.staging_prefix)
            .tempdir_in(&self.staging_parent)?;
        debug!("Staging in {}", staging.path().display());
        Ok(staging)
    }
}

/// Downloads catalog entries into the output directory
pub struct TransferPipeline<'a, S> {
    session: &'a S,
    config: TransferConfig,
}

impl<'a, S: RemoteSession> TransferPipeline<'a, S> {
    pub fn new(session: &'a S, config: TransferConfig) -> Self {
        Self { session, config }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Final paths the entry's files would be written to, data file first
    ///
    /// # Errors
    ///
    /// Returns `TransferError::MissingDataFile` for an entry without data file
    pub fn destinations(&self, entry: &LogEntry) -> TransferResult<Vec<(String, PathBuf)>> {
        let data_path = entry
            .data_path
            .as_deref()
            .ok_or_else(|| TransferError::MissingDataFile {
                date: entry.date.clone(),
                time: entry.time.clone(),
            })?;

        Ok(std::iter::once(data_path)
            .chain(entry.key_path.as_deref())
            .map(|remote| {
                let extension = file_extension(remote_file_name(remote));
                let output = self
                    .config
                    .output_dir
                    .join(output_file_name(&entry.date, &entry.time, extension));
                (remote.to_string(), output)
            })
            .collect())
    }

    /// Download the data file and, if present, the key file of `entry`
    ///
    /// Returns the output paths in transfer order. A failure aborts the
    /// remaining transfers; files already relocated stay in place.
    pub async fn download(
        &self,
        entry: &LogEntry,
        reporter: &mut dyn TransferReporter,
    ) -> TransferResult<Vec<PathBuf>> {
        let destinations = self.destinations(entry)?;

        if !self.config.overwrite {
            for (_, output) in &destinations {
                if output.exists() {
                    return Err(TransferError::OutputExists {
                        path: output.clone(),
                    });
                }
            }
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;
        let staging = self.config.staging_dir()?;

        let mut outputs = Vec::with_capacity(destinations.len());
        for (remote, _) in &destinations {
            let output = stage_and_relocate(
                self.session,
                remote,
                staging.path(),
                |extension| {
                    self.config
                        .output_dir
                        .join(output_file_name(&entry.date, &entry.time, extension))
                },
                self.config.overwrite,
                reporter,
            )
            .await?;
            outputs.push(output);
        }

        staging.close()?;
        Ok(outputs)
    }
}

/// Download one remote file into an empty staging directory and rename it
///
/// `destination` maps the staged file's extension to its final path. The
/// staging directory is empty again when this returns `Ok`.
pub async fn stage_and_relocate<S, F>(
    session: &S,
    remote_path: &str,
    staging_dir: &Path,
    destination: F,
    overwrite: bool,
    reporter: &mut dyn TransferReporter,
) -> TransferResult<PathBuf>
where
    S: RemoteSession,
    F: FnOnce(&str) -> PathBuf,
{
    info!("Downloading {}", remote_path);
    reporter.report(TransferEvent::Started {
        remote_path: remote_path.to_string(),
    });

    let mut tracker = PercentTracker::default();
    let mut updates = session.download(remote_path, staging_dir);
    while let Some(update) = updates.next().await {
        let progress = update.map_err(|e| {
            warn!("Transfer of {} failed: {}", remote_path, e);
            e
        })?;
        if let Some(percent) = tracker.update(progress.percent()) {
            reporter.report(TransferEvent::Progress { percent });
        }
    }
    drop(updates);

    let staged = single_staged_file(staging_dir).await?;
    let staged_name = staged
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = destination(file_extension(&staged_name));

    if output.exists() {
        if !overwrite {
            return Err(TransferError::OutputExists { path: output });
        }
        tokio::fs::remove_file(&output).await?;
    }

    tokio::fs::rename(&staged, &output)
        .await
        .map_err(|source| TransferError::AtomicOperationFailed {
            temp_path: staged.clone(),
            final_path: output.clone(),
            source,
        })?;

    info!("file: {}", output.display());
    reporter.report(TransferEvent::Completed {
        output: output.clone(),
    });
    Ok(output)
}

/// The only entry of `staging_dir`
pub async fn single_staged_file(staging_dir: &Path) -> TransferResult<PathBuf> {
    let mut reader = tokio::fs::read_dir(staging_dir).await?;
    let mut found = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        found.push(entry.path());
    }

    match found.len() {
        1 if found[0].is_file() => Ok(found.remove(0)),
        count => Err(TransferError::StagingMismatch { found: count }),
    }
}

/// Extension after the last `.`, empty if none
fn file_extension(name: &str) -> &str {
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::catalog::EntryPatch;
    use crate::app::session::MemorySession;
    use crate::errors::SessionError;
    use tempfile::TempDir;

    const DATA: &str = "/fs/microsd/log/2024-05-01/14_03_22.ulgc";
    const KEY: &str = "/fs/microsd/log/2024-05-01/14_03_22.ulgk";

    struct Dirs {
        output: TempDir,
        staging: TempDir,
    }

    impl Dirs {
        fn new() -> Self {
            Self {
                output: TempDir::new().unwrap(),
                staging: TempDir::new().unwrap(),
            }
        }

        fn config(&self) -> TransferConfig {
            TransferConfig::with_output_dir(self.output.path())
                .with_staging_parent(self.staging.path())
        }
    }

    fn count_entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    fn encrypted_entry() -> LogEntry {
        let mut entry = LogEntry::new("2024-05-01", "14_03_22");
        entry.apply(EntryPatch::data(DATA, true, Some(3000)));
        entry.apply(EntryPatch::key(KEY));
        entry
    }

    fn plain_entry() -> LogEntry {
        let mut entry = LogEntry::new("2024-05-01", "15_00_00");
        entry.apply(EntryPatch::data(
            "/fs/microsd/log/2024-05-01/15_00_00.ulg",
            false,
            Some(500),
        ));
        entry
    }

    #[test]
    fn test_percent_tracker() {
        let mut tracker = PercentTracker::default();
        assert_eq!(tracker.update(0), Some(0));
        assert_eq!(tracker.update(0), None);
        assert_eq!(tracker.update(5), Some(5));
        assert_eq!(tracker.update(5), None);
        assert_eq!(tracker.update(100), Some(100));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("14_03_22.ulgc"), "ulgc");
        assert_eq!(file_extension("a.b.ulg"), "ulg");
        assert_eq!(file_extension("config"), "");
    }

    #[tokio::test]
    async fn test_download_plain_entry() {
        let dirs = Dirs::new();
        let session = MemorySession::new()
            .with_file("/fs/microsd/log/2024-05-01/15_00_00.ulg", vec![3u8; 500]);
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let mut events = Vec::new();
        let outputs = pipeline
            .download(&plain_entry(), &mut |event: TransferEvent| events.push(event))
            .await
            .unwrap();

        let expected = dirs.output.path().join("log-2024-05-01T15-00-00Z.ulg");
        assert_eq!(outputs, vec![expected.clone()]);
        assert_eq!(std::fs::read(&expected).unwrap().len(), 500);
        assert_eq!(count_entries(dirs.staging.path()), 0);
        assert_eq!(
            events.last(),
            Some(&TransferEvent::Completed { output: expected })
        );
    }

    #[tokio::test]
    async fn test_download_encrypted_pair_data_first() {
        let dirs = Dirs::new();
        let session = MemorySession::new()
            .with_file(KEY, vec![9u8; 16])
            .with_file(DATA, vec![1u8; 3000]);
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let outputs = pipeline
            .download(&encrypted_entry(), &mut SilentReporter)
            .await
            .unwrap();

        assert_eq!(
            outputs,
            vec![
                dirs.output.path().join("log-2024-05-01T14-03-22Z.ulgc"),
                dirs.output.path().join("log-2024-05-01T14-03-22Z.ulgk"),
            ]
        );
        let downloads: Vec<_> = session
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("download"))
            .collect();
        assert_eq!(
            downloads,
            vec![format!("download {}", DATA), format!("download {}", KEY)]
        );
        assert_eq!(count_entries(dirs.staging.path()), 0);
    }

    #[tokio::test]
    async fn test_failure_mid_stream_leaves_no_trace() {
        let dirs = Dirs::new();
        let session = MemorySession::new()
            .with_file(DATA, vec![1u8; 3000])
            .with_file(KEY, vec![9u8; 16])
            .with_chunk_size(500)
            .with_download_failure(DATA, 3);
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let result = pipeline.download(&encrypted_entry(), &mut SilentReporter).await;

        assert!(matches!(
            result,
            Err(TransferError::TransferFailed(
                SessionError::TransferInterrupted { .. }
            ))
        ));
        assert_eq!(count_entries(dirs.output.path()), 0);
        assert_eq!(count_entries(dirs.staging.path()), 0);
        assert!(!session.calls().contains(&format!("download {}", KEY)));
    }

    #[tokio::test]
    async fn test_key_failure_keeps_completed_data_file() {
        let dirs = Dirs::new();
        let session = MemorySession::new()
            .with_file(DATA, vec![1u8; 3000])
            .with_file(KEY, vec![9u8; 16])
            .with_download_failure(KEY, 0);
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let result = pipeline.download(&encrypted_entry(), &mut SilentReporter).await;

        assert!(result.is_err());
        assert!(dirs
            .output
            .path()
            .join("log-2024-05-01T14-03-22Z.ulgc")
            .exists());
        assert!(!dirs
            .output
            .path()
            .join("log-2024-05-01T14-03-22Z.ulgk")
            .exists());
        assert_eq!(count_entries(dirs.staging.path()), 0);
    }

    #[tokio::test]
    async fn test_existing_output_is_protected() {
        let dirs = Dirs::new();
        let existing = dirs.output.path().join("log-2024-05-01T15-00-00Z.ulg");
        std::fs::write(&existing, b"old").unwrap();
        let session = MemorySession::new()
            .with_file("/fs/microsd/log/2024-05-01/15_00_00.ulg", vec![3u8; 500]);
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let result = pipeline.download(&plain_entry(), &mut SilentReporter).await;

        assert!(matches!(result, Err(TransferError::OutputExists { .. })));
        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_output() {
        let dirs = Dirs::new();
        let existing = dirs.output.path().join("log-2024-05-01T15-00-00Z.ulg");
        std::fs::write(&existing, b"old").unwrap();
        let session = MemorySession::new()
            .with_file("/fs/microsd/log/2024-05-01/15_00_00.ulg", vec![3u8; 500]);
        let pipeline = TransferPipeline::new(&session, dirs.config().with_overwrite(true));

        pipeline.download(&plain_entry(), &mut SilentReporter).await.unwrap();

        assert_eq!(std::fs::read(&existing).unwrap().len(), 500);
    }

    #[tokio::test]
    async fn test_entry_without_data_file() {
        let dirs = Dirs::new();
        let session = MemorySession::new();
        let pipeline = TransferPipeline::new(&session, dirs.config());
        let mut entry = LogEntry::new("2024-05-01", "14_03_22");
        entry.apply(EntryPatch::key(KEY));

        let result = pipeline.download(&entry, &mut SilentReporter).await;

        assert!(matches!(result, Err(TransferError::MissingDataFile { .. })));
        assert_eq!(count_entries(dirs.staging.path()), 0);
    }

    #[tokio::test]
    async fn test_progress_only_reported_on_change() {
        let dirs = Dirs::new();
        let session = MemorySession::new()
            .with_file("/fs/microsd/log/2024-05-01/15_00_00.ulg", vec![3u8; 500])
            .with_chunk_size(1);
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let mut percents = Vec::new();
        pipeline
            .download(&plain_entry(), &mut |event: TransferEvent| {
                if let TransferEvent::Progress { percent } = event {
                    percents.push(percent);
                }
            })
            .await
            .unwrap();

        assert!(percents.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
        assert_eq!(percents.len(), 101);
    }

    #[tokio::test]
    async fn test_fractional_progress() {
        let dirs = Dirs::new();
        let session = MemorySession::new()
            .with_file("/fs/microsd/log/2024-05-01/15_00_00.ulg", vec![3u8; 500])
            .with_chunk_size(250)
            .with_fractional_progress();
        let pipeline = TransferPipeline::new(&session, dirs.config());

        let mut percents = Vec::new();
        pipeline
            .download(&plain_entry(), &mut |event: TransferEvent| {
                if let TransferEvent::Progress { percent } = event {
                    percents.push(percent);
                }
            })
            .await
            .unwrap();

        assert_eq!(percents, vec![50, 100]);
    }

    #[tokio::test]
    async fn test_failed_rename_keeps_cause() {
        let dirs = Dirs::new();
        let session =
            MemorySession::new().with_file("/fs/microsd/log/2024-05-01/15_00_00.ulg", vec![3u8; 10]);
        let staging = dirs.config().staging_dir().unwrap();
        let missing = dirs.output.path().join("unmounted");

        let err = stage_and_relocate(
            &session,
            "/fs/microsd/log/2024-05-01/15_00_00.ulg",
            staging.path(),
            |extension| missing.join(format!("log.{}", extension)),
            false,
            &mut SilentReporter,
        )
        .await
        .unwrap_err();

        match &err {
            TransferError::AtomicOperationFailed { source, final_path, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
                assert_eq!(final_path, &missing.join("log.ulg"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_single_staged_file_mismatch() {
        let staging = TempDir::new().unwrap();
        assert!(matches!(
            single_staged_file(staging.path()).await,
            Err(TransferError::StagingMismatch { found: 0 })
        ));

        std::fs::write(staging.path().join("a.ulg"), b"a").unwrap();
        assert!(single_staged_file(staging.path()).await.is_ok());

        std::fs::write(staging.path().join("b.ulg"), b"b").unwrap();
        assert!(matches!(
            single_staged_file(staging.path()).await,
            Err(TransferError::StagingMismatch { found: 2 })
        ));
    }
}
