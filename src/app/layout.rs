//! Layout of the device storage

use serde::{Deserialize, Serialize};

use crate::app::session::join_remote;
use crate::constants::remote;

/// Where logs and configuration live on the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLayout {
    /// Storage mount, e.g. `/fs/microsd`
    pub storage_root: String,
    /// Log subtree, relative to the storage root
    pub log_dir: String,
    /// Configuration directory, relative to the storage root
    pub config_dir: String,
    /// Configuration file name
    pub config_file: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            storage_root: remote::STORAGE_ROOT.to_string(),
            log_dir: remote::LOG_DIR.to_string(),
            config_dir: remote::CONFIG_DIR.to_string(),
            config_file: remote::CONFIG_FILE.to_string(),
        }
    }
}

impl RemoteLayout {
    /// Absolute path of the log subtree
    pub fn log_path(&self) -> String {
        join_remote(&self.storage_root, &self.log_dir)
    }

    /// Absolute path of the configuration directory
    pub fn config_dir_path(&self) -> String {
        join_remote(&self.storage_root, &self.config_dir)
    }

    /// Absolute path of the configuration file
    pub fn config_file_path(&self) -> String {
        join_remote(&self.config_dir_path(), &self.config_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let layout = RemoteLayout::default();
        assert_eq!(layout.log_path(), "/fs/microsd/log");
        assert_eq!(layout.config_dir_path(), "/fs/microsd/etc");
        assert_eq!(layout.config_file_path(), "/fs/microsd/etc/config.txt");
    }
}
