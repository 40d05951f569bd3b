//! Catalog building over the remote log tree
//!
//! Lists the date directories under the log subtree, then the files of each
//! date directory, and folds every recognised log file into a
//! [`CatalogStore`]. In [`CatalogMode::Latest`] malformed or future dates and
//! malformed times are skipped with a warning; [`CatalogMode::Interactive`]
//! shows everything parsable and leaves the judgement to the operator.

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use super::models::{EntryPatch, LogEntry};
use super::store::CatalogStore;
use crate::app::layout::RemoteLayout;
use crate::app::listing::{parse_listing, ListingRecord, LogFileName};
use crate::app::remote_dir::RemoteDirectoryValidator;
use crate::app::session::{join_remote, RemoteSession};
use crate::constants::{logs, remote};
use crate::errors::{CatalogError, CatalogResult, MalformedEntry};

/// Filtering policy applied while cataloging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogMode {
    /// Automatic selection: only valid, non-future dates and valid times
    Latest,
    /// Operator selection: every parsable entry
    Interactive,
}

/// Result of one catalog pass
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    store: CatalogStore,
    skipped: Vec<MalformedEntry>,
}

impl Catalog {
    /// Entries in discovery order
    pub fn entries(&self) -> &[LogEntry] {
        self.store.all()
    }

    /// Entries skipped by the filtering policy
    pub fn skipped(&self) -> &[MalformedEntry] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn skip(&mut self, entry: MalformedEntry) {
        warn!("{}", entry);
        self.skipped.push(entry);
    }
}

/// Builds a [`Catalog`] from the remote log tree
pub struct CatalogBuilder<'a, S> {
    session: &'a S,
    layout: &'a RemoteLayout,
    mode: CatalogMode,
    today: NaiveDate,
}

impl<'a, S: RemoteSession> CatalogBuilder<'a, S> {
    pub fn new(session: &'a S, layout: &'a RemoteLayout, mode: CatalogMode) -> Self {
        Self {
            session,
            layout,
            mode,
            today: Local::now().date_naive(),
        }
    }

    /// Date used for the future-date rule
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Confirm the storage mount and the log subtree exist
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::RootNotFound` naming the first missing directory
    pub async fn validate_log_path(&self) -> CatalogResult<()> {
        let validator = RemoteDirectoryValidator::new(self.session);

        if !validator.exists(&self.layout.storage_root).await? {
            return Err(CatalogError::RootNotFound {
                path: self.layout.storage_root.clone(),
                hint: remote::STORAGE_HINT.to_string(),
            });
        }

        let log_path = self.layout.log_path();
        if !validator.exists(&log_path).await? {
            return Err(CatalogError::RootNotFound {
                path: log_path,
                hint: "No logs have been recorded on this storage.".to_string(),
            });
        }

        Ok(())
    }

    /// Validate the layout and catalog every log file
    pub async fn build(&self) -> CatalogResult<Catalog> {
        self.validate_log_path().await?;

        let log_path = self.layout.log_path();
        let mut catalog = Catalog::default();

        let date_listing = self.session.list_directory(&log_path).await?;
        for record in parse_listing(&date_listing) {
            let ListingRecord::Directory { name: date } = record else {
                continue;
            };

            if self.mode == CatalogMode::Latest {
                if let Err(skipped) = check_date(&date, self.today) {
                    catalog.skip(skipped);
                    continue;
                }
            }

            let date_path = join_remote(&log_path, &date);
            let file_listing = self.session.list_directory(&date_path).await?;
            self.catalog_files(&mut catalog, &date, &date_path, &file_listing);
        }

        info!(
            "Cataloged {} logs ({} skipped)",
            catalog.len(),
            catalog.skipped.len()
        );
        Ok(catalog)
    }

    fn catalog_files(&self, catalog: &mut Catalog, date: &str, date_path: &str, listing: &[String]) {
        for record in parse_listing(listing) {
            let ListingRecord::File { name, size_bytes } = record else {
                continue;
            };
            let Some(log_name) = LogFileName::parse(&name) else {
                debug!("Skipping non-log file {}/{}", date, name);
                continue;
            };

            if self.mode == CatalogMode::Latest && !log_name.has_valid_time() {
                catalog.skip(MalformedEntry::InvalidTime {
                    date: date.to_string(),
                    stem: log_name.stem,
                });
                continue;
            }

            let path = join_remote(date_path, &name);
            let patch = if log_name.kind.is_data() {
                EntryPatch::data(path, log_name.kind.is_encrypted(), size_bytes)
            } else {
                EntryPatch::key(path)
            };
            catalog.store.upsert(date, &log_name.stem, patch);
        }
    }
}

/// Check a date directory name against the calendar and `today`
///
/// Only the zero-padded form is accepted, since entries are ordered by
/// comparing names.
pub fn check_date(name: &str, today: NaiveDate) -> Result<NaiveDate, MalformedEntry> {
    let date = NaiveDate::parse_from_str(name, logs::DATE_FORMAT)
        .ok()
        .filter(|date| date.format(logs::DATE_FORMAT).to_string() == name)
        .ok_or_else(|| MalformedEntry::InvalidDate {
            name: name.to_string(),
        })?;
    if date > today {
        return Err(MalformedEntry::FutureDate {
            name: name.to_string(),
        });
    }
    Ok(date)
}
