//! Core application logic for Flightlog Fetcher
//!
//! This module contains the session abstraction, listing parser, catalog
//! builder, entry selection and the staged download pipeline.
//!
//! # Examples
//!
//! ```rust,no_run
//! use flightlog_fetcher::app::{
//!     connect, select_latest, CatalogBuilder, CatalogMode, RemoteLayout, SilentReporter,
//!     TransferConfig, TransferPipeline,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = connect("file:///media/sdcard").await?;
//! let layout = RemoteLayout::default();
//!
//! let catalog = CatalogBuilder::new(&session, &layout, CatalogMode::Latest)
//!     .build()
//!     .await?;
//! let entry = select_latest(catalog.entries())?;
//!
//! let pipeline = TransferPipeline::new(&session, TransferConfig::with_output_dir("logs"));
//! for path in pipeline.download(entry, &mut SilentReporter).await? {
//!     println!("file: {}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod layout;
pub mod listing;
pub mod naming;
pub mod remote_config;
pub mod remote_dir;
pub mod selector;
pub mod session;
pub mod transfer;

// Re-export main public API
pub use catalog::{Catalog, CatalogBuilder, CatalogMode, EntryPatch, LogEntry};
pub use layout::RemoteLayout;
pub use listing::{parse_line, parse_listing, ListingRecord, LogFileKind, LogFileName};
pub use naming::output_file_name;
pub use remote_config::{fetch_config, remove_config, ConfigFileStatus};
pub use remote_dir::RemoteDirectoryValidator;
pub use selector::{render_listing, select_interactive, select_latest};
pub use session::{
    connect, resolve_mount_address, MemorySession, MountedSession, RemoteSession,
    TransferProgress,
};
pub use transfer::{
    PercentTracker, SilentReporter, TransferConfig, TransferEvent, TransferPipeline,
    TransferReporter,
};
