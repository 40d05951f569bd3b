//! Log catalog: model, merge store and remote tree walk
//!
//! The module is organized into specialized components:
//! - `models`: `LogEntry`, `EntryPatch` and size labels
//! - `store`: ordered store merging entries per (date, time)
//! - `builder`: walks the remote log tree and fills the store

pub mod builder;
pub mod models;
pub mod store;

pub use builder::{check_date, Catalog, CatalogBuilder, CatalogMode};
pub use models::{format_size, EntryPatch, LogEntry};
pub use store::CatalogStore;
