//! Error types for Flightlog Fetcher
//!
//! This module defines the error types for every component of the application.
//! Errors are designed to be actionable and to carry enough context for both
//! logging and user-facing messages.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the remote session (the device's file service)
#[derive(Error, Debug)]
pub enum SessionError {
    /// Remote path does not exist
    #[error("Remote path not found: {path}")]
    NotFound { path: String },

    /// Connection string could not be turned into a session
    #[error("Unsupported address '{address}': {reason}")]
    UnsupportedAddress { address: String, reason: String },

    /// Device refused the request
    #[error("Remote request rejected for {path}: {reason}")]
    Rejected { path: String, reason: String },

    /// Transfer stream ended with an error
    #[error("Transfer of {path} interrupted: {reason}")]
    TransferInterrupted { path: String, reason: String },

    /// Local I/O error while serving or receiving a file
    #[error("Session I/O error")]
    Io(#[from] std::io::Error),
}

/// Catalog building errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Storage mount or log subtree is absent on the device
    #[error("Directory {path} not found. {hint}")]
    RootNotFound { path: String, hint: String },

    /// Listing request failed
    #[error("Remote listing failed")]
    Session(#[from] SessionError),
}

/// A remote entry that was skipped while cataloging
///
/// Never returned as an error, only logged and counted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEntry {
    /// Date directory name is not a calendar date
    #[error("Invalid date format: {name}")]
    InvalidDate { name: String },

    /// Date directory lies after today
    #[error("Invalid future date: {name}")]
    FutureDate { name: String },

    /// File stem is not HH_MM_SS
    #[error("Invalid time format: {date}/{stem}")]
    InvalidTime { date: String, stem: String },
}

/// Entry selection outcomes that do not yield an index
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// Catalog has no entries to select from
    #[error("No log files found")]
    NoEntries,

    /// Operator entered nothing
    #[error("Selection cancelled")]
    Cancelled,

    /// Index outside the catalog
    #[error("Index {index} out of bounds, expected 0..{len}")]
    OutOfRange { index: i64, len: usize },

    /// Input was not an integer
    #[error("Invalid selection '{input}', expected a log index")]
    NotANumber { input: String },
}

/// Download pipeline errors
#[derive(Error, Debug)]
pub enum TransferError {
    /// Transport reported a failure
    #[error("Transfer failed")]
    TransferFailed(#[from] SessionError),

    /// Local file system error
    #[error("File I/O error")]
    Io(#[from] std::io::Error),

    /// Entry has a key file but no data file
    #[error("Log {date}/{time} has no data file")]
    MissingDataFile { date: String, time: String },

    /// Destination already exists and overwrite was not requested
    #[error("File already exists: {path}. Use --force to overwrite")]
    OutputExists { path: PathBuf },

    /// Staging directory did not hold exactly one file after a transfer
    #[error("Expected exactly one staged file, found {found}")]
    StagingMismatch { found: usize },

    /// Rename out of the staging directory failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Default configuration could not be rendered
    #[error("Failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Reading or writing the configuration file failed
    #[error("Configuration file I/O error")]
    Io(#[from] std::io::Error),
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Session error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Catalog error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Selection error
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Transfer error
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serializing output failed
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the process should still exit successfully
    ///
    /// Operator cancellations and rejected selections end the run without a
    /// download but are not failures.
    pub fn is_clean_exit(&self) -> bool {
        matches!(
            self,
            AppError::Selection(SelectionError::Cancelled)
                | AppError::Selection(SelectionError::OutOfRange { .. })
                | AppError::Selection(SelectionError::NotANumber { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Session(_) => "session",
            AppError::Catalog(_) => "catalog",
            AppError::Selection(_) => "selection",
            AppError::Transfer(_) => "transfer",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Json(_) => "output",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Selection result type alias
pub type SelectionResult<T> = std::result::Result<T, SelectionError>;

/// Transfer result type alias
pub type TransferResult<T> = std::result::Result<T, TransferError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_errors_exit_cleanly() {
        assert!(AppError::from(SelectionError::Cancelled).is_clean_exit());
        assert!(AppError::from(SelectionError::OutOfRange { index: 3, len: 3 }).is_clean_exit());
        assert!(!AppError::from(SelectionError::NoEntries).is_clean_exit());
    }

    #[test]
    fn test_root_not_found_is_fatal() {
        let err = AppError::from(CatalogError::RootNotFound {
            path: "/fs/microsd".to_string(),
            hint: "Verify that SD-card exists in the drone!".to_string(),
        });

        assert!(!err.is_clean_exit());
        assert_eq!(err.category(), "catalog");
        assert!(err.to_string().contains("/fs/microsd"));
    }

    #[test]
    fn test_transfer_error_wraps_session_error() {
        let session = SessionError::TransferInterrupted {
            path: "/fs/microsd/log/2024-05-01/14_03_22.ulg".to_string(),
            reason: "link lost".to_string(),
        };
        let err = AppError::from(TransferError::from(session));

        assert_eq!(err.category(), "transfer");
    }
}
