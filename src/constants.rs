//! Application constants for Flightlog Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

/// Environment variable names for configuration overrides
pub mod env {
    /// Connection string override
    pub const ADDRESS: &str = "FLIGHTLOG_ADDRESS";

    /// Output directory override
    pub const OUTPUT_DIR: &str = "FLIGHTLOG_OUTPUT_DIR";
}

/// Fixed layout of the device storage
pub mod remote {
    /// Root path of the remote file service
    pub const ROOT: &str = "/";

    /// Path separator used by the remote file service
    pub const SEPARATOR: char = '/';

    /// Storage mount (SD card)
    pub const STORAGE_ROOT: &str = "/fs/microsd";

    /// Log subtree, relative to the storage root
    pub const LOG_DIR: &str = "log";

    /// Configuration directory, relative to the storage root
    pub const CONFIG_DIR: &str = "etc";

    /// Configuration file name inside the configuration directory
    pub const CONFIG_FILE: &str = "config.txt";

    /// Hint printed when the storage mount is missing
    pub const STORAGE_HINT: &str = "Verify that SD-card exists in the drone!";
}

/// Raw directory listing format
pub mod listing {
    /// Prefix of a subdirectory line
    pub const DIRECTORY_MARKER: char = 'D';

    /// Prefix of a file line
    pub const FILE_MARKER: char = 'F';
}

/// Log file naming on the device
pub mod logs {
    /// Plain log data file extension
    pub const PLAIN_EXTENSION: &str = "ulg";

    /// Encrypted log data file extension
    pub const ENCRYPTED_EXTENSION: &str = "ulgc";

    /// Detached key file extension
    pub const KEY_EXTENSION: &str = "ulgk";

    /// Date directory name format
    pub const DATE_FORMAT: &str = "%Y-%m-%d";

    /// File stem time format
    pub const TIME_FORMAT: &str = "%H_%M_%S";
}

/// Size label formatting
pub mod sizes {
    /// Sizes above this many bytes are labelled in MB instead of kB
    pub const MEGABYTE_THRESHOLD: u64 = 999_999;

    /// Width the numeric part of a size label is right-justified to
    pub const LABEL_WIDTH: usize = 8;
}

/// Local output and staging
pub mod files {
    /// Prefix of staging directory names
    pub const STAGING_PREFIX: &str = ".part_";

    /// Prefix of output file names
    pub const OUTPUT_PREFIX: &str = "log-";

    /// Chunk size used when copying from a mounted device tree
    pub const COPY_CHUNK_SIZE: usize = 64 * 1024;
}

/// Interactive listing layout
pub mod display {
    /// Width of the index column
    pub const INDEX_WIDTH: usize = 5;

    /// Width of the date/time column
    pub const NAME_WIDTH: usize = 25;

    /// Suffix for encrypted entries
    pub const ENCRYPTED_SUFFIX: &str = " (encrypted)";

    /// Suffix for encrypted entries without a key file
    pub const KEY_MISSING_SUFFIX: &str = " KEYFILE MISSING";
}

// Re-export commonly used constants at the module level
pub use files::STAGING_PREFIX;
pub use remote::{LOG_DIR, STORAGE_ROOT};
