//! Flightlog Fetcher Library
//!
//! A Rust library for cataloging and downloading flight logs from a flight
//! controller's storage over a minimal list/download file service.
//! Builds a merged catalog from raw directory listings, selects an entry and
//! downloads it through a crash-safe staging directory.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
