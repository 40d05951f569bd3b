//! Parsing of raw remote directory listings
//!
//! The device only reports `D<name>` for subdirectories and
//! `F<name>\t<size>` for files. This module turns those lines into typed
//! records and classifies log file names by extension.

use chrono::NaiveTime;
use tracing::debug;

use crate::constants::{listing, logs};

/// One recognised listing line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingRecord {
    /// Subdirectory
    Directory { name: String },
    /// File with its reported size, if any
    File {
        name: String,
        size_bytes: Option<u64>,
    },
}

/// Role of a log file, derived from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFileKind {
    /// `.ulg`
    PlainData,
    /// `.ulgc`
    EncryptedData,
    /// `.ulgk`
    Key,
}

impl LogFileKind {
    /// Map an extension to its role
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension {
            logs::PLAIN_EXTENSION => Some(Self::PlainData),
            logs::ENCRYPTED_EXTENSION => Some(Self::EncryptedData),
            logs::KEY_EXTENSION => Some(Self::Key),
            _ => None,
        }
    }

    /// Whether the file belongs to an encrypted log
    pub fn is_encrypted(&self) -> bool {
        matches!(self, Self::EncryptedData | Self::Key)
    }

    /// Whether the file carries log payload
    pub fn is_data(&self) -> bool {
        matches!(self, Self::PlainData | Self::EncryptedData)
    }
}

/// A log file name split into time stem and role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileName {
    pub stem: String,
    pub extension: String,
    pub kind: LogFileKind,
}

impl LogFileName {
    /// Split on the last `.` and classify the extension
    ///
    /// Returns `None` for names without an extension or with an extension
    /// that is not a log role.
    pub fn parse(name: &str) -> Option<Self> {
        let (stem, extension) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        let kind = LogFileKind::from_extension(extension)?;
        Some(Self {
            stem: stem.to_string(),
            extension: extension.to_string(),
            kind,
        })
    }

    /// Whether the stem is a valid `HH_MM_SS` time
    pub fn has_valid_time(&self) -> bool {
        is_valid_time_stem(&self.stem)
    }
}

/// Parse one raw listing line
///
/// Lines that start with neither marker yield `None` and are never fatal.
pub fn parse_line(line: &str) -> Option<ListingRecord> {
    let line = line.trim_matches(|c: char| c == '\0' || c == '\r' || c == '\n');
    let mut chars = line.chars();
    let marker = chars.next()?;
    let rest = chars.as_str();

    match marker {
        listing::DIRECTORY_MARKER if !rest.is_empty() => Some(ListingRecord::Directory {
            name: rest.to_string(),
        }),
        listing::FILE_MARKER => {
            let mut fields = rest.split_whitespace();
            let name = fields.next()?.to_string();
            let size_bytes = fields.next().and_then(|size| size.parse().ok());
            Some(ListingRecord::File { name, size_bytes })
        }
        _ => {
            debug!("Ignoring listing line: {:?}", line);
            None
        }
    }
}

/// Parse every line of a listing, dropping unrecognised lines
pub fn parse_listing<S: AsRef<str>>(lines: &[S]) -> Vec<ListingRecord> {
    lines
        .iter()
        .filter_map(|line| parse_line(line.as_ref()))
        .collect()
}

/// Whether a listing holds a subdirectory called `name`
pub fn contains_directory<S: AsRef<str>>(lines: &[S], name: &str) -> bool {
    lines.iter().any(|line| {
        matches!(parse_line(line.as_ref()), Some(ListingRecord::Directory { name: n }) if n == name)
    })
}

/// Whether a listing holds a file called `name`
pub fn contains_file<S: AsRef<str>>(lines: &[S], name: &str) -> bool {
    lines.iter().any(|line| {
        matches!(parse_line(line.as_ref()), Some(ListingRecord::File { name: n, .. }) if n == name)
    })
}

/// Whether `stem` is a valid, zero-padded `HH_MM_SS` time
pub fn is_valid_time_stem(stem: &str) -> bool {
    NaiveTime::parse_from_str(stem, logs::TIME_FORMAT)
        .map(|time| time.format(logs::TIME_FORMAT).to_string() == stem)
        .unwrap_or(false)
}
