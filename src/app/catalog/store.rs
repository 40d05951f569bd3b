//! Ordered, merge-on-insert store of catalog entries

use std::collections::HashMap;

use super::models::{EntryPatch, LogEntry};

/// Catalog entries in discovery order, unique per (date, time)
#[derive(Debug, Clone, Default)]
pub struct CatalogStore {
    entries: Vec<LogEntry>,
    index: HashMap<(String, String), usize>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge the entry for (date, time)
    ///
    /// A new key is appended in discovery order; an existing key keeps its
    /// position. Fields present in `patch` overwrite, absent ones are kept.
    pub fn upsert(&mut self, date: &str, time: &str, patch: EntryPatch) -> &LogEntry {
        let key = (date.to_string(), time.to_string());
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.entries.push(LogEntry::new(date, time));
                let position = self.entries.len() - 1;
                self.index.insert(key, position);
                position
            }
        };

        let entry = &mut self.entries[position];
        entry.apply(patch);
        entry
    }

    /// Entry for (date, time)
    pub fn get(&self, date: &str, time: &str) -> Option<&LogEntry> {
        self.index
            .get(&(date.to_string(), time.to_string()))
            .map(|&position| &self.entries[position])
    }

    /// All entries in discovery order
    pub fn all(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_patches_merge_in_either_order() {
        let data = || EntryPatch::data("/log/2024-05-01/14_03_22.ulgc", true, Some(10));
        let key = || EntryPatch::key("/log/2024-05-01/14_03_22.ulgk");

        let mut data_first = CatalogStore::new();
        data_first.upsert("2024-05-01", "14_03_22", data());
        data_first.upsert("2024-05-01", "14_03_22", key());

        let mut key_first = CatalogStore::new();
        key_first.upsert("2024-05-01", "14_03_22", key());
        key_first.upsert("2024-05-01", "14_03_22", data());

        assert_eq!(data_first.len(), 1);
        assert_eq!(key_first.len(), 1);
        assert_eq!(data_first.all(), key_first.all());

        let entry = data_first.get("2024-05-01", "14_03_22").unwrap();
        assert!(entry.data_path.is_some());
        assert!(entry.key_path.is_some());
    }

    #[test]
    fn test_preserves_discovery_order() {
        let mut store = CatalogStore::new();
        store.upsert("2024-05-02", "09_00_00", EntryPatch::default());
        store.upsert("2024-05-01", "23_00_00", EntryPatch::default());
        store.upsert("2024-05-02", "09_00_00", EntryPatch::key("/k"));

        let names: Vec<_> = store.all().iter().map(LogEntry::display_name).collect();
        assert_eq!(names, vec!["2024-05-02/09_00_00", "2024-05-01/23_00_00"]);
    }

    #[test]
    fn test_same_time_on_different_dates_stays_separate() {
        let mut store = CatalogStore::new();
        store.upsert("2024-05-01", "10_00_00", EntryPatch::data("/a", false, None));
        store.upsert("2024-05-02", "10_00_00", EntryPatch::data("/b", false, None));

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_empty_patch_does_not_clear() {
        let mut store = CatalogStore::new();
        store.upsert("2024-05-01", "10_00_00", EntryPatch::data("/a", true, Some(1)));
        let entry = store.upsert("2024-05-01", "10_00_00", EntryPatch::default());

        assert_eq!(entry.data_path.as_deref(), Some("/a"));
        assert!(entry.encrypted);
    }
}
