//! Catalog data model
//!
//! A [`LogEntry`] is keyed by the (date, time) of the log. Data and key files
//! of one log arrive as separate listing records and are merged through
//! [`EntryPatch`].

use serde::{Deserialize, Serialize};

use crate::constants::sizes;

/// One cataloged log
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogEntry {
    /// `YYYY-MM-DD`, from the date directory name
    pub date: String,
    /// `HH_MM_SS`, from the file stem
    pub time: String,
    /// Whether the log payload is encrypted
    pub encrypted: bool,
    /// Remote path of the log payload
    pub data_path: Option<String>,
    /// Remote path of the detached key file
    pub key_path: Option<String>,
    /// Human readable payload size, set together with `data_path`
    pub size_label: Option<String>,
}

impl LogEntry {
    /// Empty entry for a (date, time) key
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            ..Default::default()
        }
    }

    /// `date/time` as shown to the operator
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.date, self.time)
    }

    /// Encrypted but no key file has been found
    pub fn is_key_missing(&self) -> bool {
        self.encrypted && self.key_path.is_none()
    }

    /// Overwrite every field present in `patch`
    pub fn apply(&mut self, patch: EntryPatch) {
        if let Some(encrypted) = patch.encrypted {
            self.encrypted = encrypted;
        }
        if let Some(data_path) = patch.data_path {
            self.data_path = Some(data_path);
        }
        if let Some(key_path) = patch.key_path {
            self.key_path = Some(key_path);
        }
        if let Some(size_label) = patch.size_label {
            self.size_label = Some(size_label);
        }
    }
}

/// Partial update of a [`LogEntry`]; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPatch {
    pub encrypted: Option<bool>,
    pub data_path: Option<String>,
    pub key_path: Option<String>,
    pub size_label: Option<String>,
}

impl EntryPatch {
    /// Patch for a data file
    pub fn data(path: impl Into<String>, encrypted: bool, size_bytes: Option<u64>) -> Self {
        Self {
            encrypted: Some(encrypted),
            data_path: Some(path.into()),
            size_label: size_bytes.map(format_size),
            ..Default::default()
        }
    }

    /// Patch for a detached key file
    pub fn key(path: impl Into<String>) -> Self {
        Self {
            encrypted: Some(true),
            key_path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Format a byte count as a right-justified kB/MB label
///
/// Sizes above 999,999 bytes are shown in MB, smaller ones in kB, both with
/// two decimals.
pub fn format_size(size_bytes: u64) -> String {
    let size = size_bytes as f64;
    let (value, unit) = if size_bytes > sizes::MEGABYTE_THRESHOLD {
        (size / 1024.0 / 1024.0, "MB")
    } else {
        (size / 1024.0, "kB")
    };
    format!(
        "{:>width$} {}",
        format!("{:.2}", value),
        unit,
        width = sizes::LABEL_WIDTH
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_kilobytes() {
        assert_eq!(format_size(2048), "    2.00 kB");
        assert_eq!(format_size(999_999), "  976.56 kB");
    }

    #[test]
    fn test_format_size_megabytes() {
        assert_eq!(format_size(1_000_000), "    0.95 MB");
        assert_eq!(format_size(52_428_800), "   50.00 MB");
    }

    #[test]
    fn test_apply_merges_without_clearing() {
        let mut entry = LogEntry::new("2024-05-01", "14_03_22");
        entry.apply(EntryPatch::data("/log/a.ulgc", true, Some(2048)));
        entry.apply(EntryPatch::key("/log/a.ulgk"));

        assert_eq!(entry.data_path.as_deref(), Some("/log/a.ulgc"));
        assert_eq!(entry.key_path.as_deref(), Some("/log/a.ulgk"));
        assert_eq!(entry.size_label.as_deref(), Some("    2.00 kB"));
        assert!(entry.encrypted);
        assert!(!entry.is_key_missing());
    }

    #[test]
    fn test_key_missing_state() {
        let mut entry = LogEntry::new("2024-05-01", "14_03_22");
        entry.apply(EntryPatch::data("/log/a.ulgc", true, None));

        assert!(entry.is_key_missing());
        assert_eq!(entry.size_label, None);
    }
}
