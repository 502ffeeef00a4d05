//! Workspace configuration.
//!
//! A trellis workspace is any directory containing `.trellis/config.yaml`:
//!
//! ```yaml
//! data-dir: .trellis/data
//! parent-policy: multiple
//! upcoming-days: 7
//! ```
//!
//! Every key is optional; missing keys take the defaults shown above.

use crate::error::{ConfigError, Result};
use crate::storage::StorageBackend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the trellis directory
pub const TRELLIS_DIR_NAME: &str = ".trellis";

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Default data directory, relative to the workspace root
pub const DEFAULT_DATA_DIR: &str = ".trellis/data";

/// Default window of `upcoming`, in days
pub const DEFAULT_UPCOMING_DAYS: u32 = 7;

/// Largest accepted `upcoming-days`
pub const MAX_UPCOMING_DAYS: u32 = 3650;

/// Maximum directory depth to traverse when searching for the workspace root
pub const MAX_TRAVERSAL_DEPTH: usize = 256;

/// How many parents a task may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentPolicy {
    /// Any number of parents
    #[default]
    Multiple,

    /// At most one parent; adding a different second parent is rejected
    Single,
}

/// Configuration file structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TrellisConfig {
    /// Directory holding the JSONL tables, relative to the workspace root
    pub data_dir: String,

    /// Parent edge policy
    pub parent_policy: ParentPolicy,

    /// Default window for the upcoming-deadlines view
    pub upcoming_days: u32,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            parent_policy: ParentPolicy::default(),
            upcoming_days: DEFAULT_UPCOMING_DAYS,
        }
    }
}

impl TrellisConfig {
    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML, or
    /// holds an out-of-range value.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        let config: Self = serde_yaml::from_str(&content).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(ConfigError::from)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for an empty data directory or an
    /// upcoming window outside `1..=3650` days.
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "data-dir",
                reason: "must not be empty".to_string(),
            }
            .into());
        }
        if !(1..=MAX_UPCOMING_DAYS).contains(&self.upcoming_days) {
            return Err(ConfigError::InvalidValue {
                field: "upcoming-days",
                reason: format!("must be between 1 and {MAX_UPCOMING_DAYS}"),
            }
            .into());
        }
        Ok(())
    }

    /// The storage backend for a workspace rooted at `root`.
    #[must_use]
    pub fn backend(&self, root: &Path) -> StorageBackend {
        StorageBackend::Jsonl(root.join(&self.data_dir))
    }
}

/// Find the workspace root by searching up the directory tree.
///
/// Returns the directory containing `.trellis/`, or `None` if the
/// filesystem root or the depth limit is reached first.
pub fn find_trellis_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    let mut depth = 0;

    loop {
        if current.join(TRELLIS_DIR_NAME).is_dir() {
            return Some(current);
        }

        depth += 1;
        if depth > MAX_TRAVERSAL_DEPTH || !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn empty_yaml_takes_defaults() {
        let config: TrellisConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, TrellisConfig::default());
    }

    #[test]
    fn keys_are_kebab_case() {
        let config: TrellisConfig =
            serde_yaml::from_str("parent-policy: single\nupcoming-days: 14\n").unwrap();
        assert_eq!(config.parent_policy, ParentPolicy::Single);
        assert_eq!(config.upcoming_days, 14);
        assert_eq!(config.data_dir, DEFAULT_DATA_DIR);
    }

    #[rstest]
    #[case::zero_days("upcoming-days: 0\n", "upcoming-days")]
    #[case::huge_window("upcoming-days: 5000\n", "upcoming-days")]
    #[case::blank_dir("data-dir: '  '\n", "data-dir")]
    fn out_of_range_values_are_rejected(#[case] yaml: &str, #[case] field: &str) {
        let config: TrellisConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(
            matches!(&err, Error::Config(ConfigError::InvalidValue { field: f, .. }) if *f == field),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = TrellisConfig {
            parent_policy: ParentPolicy::Single,
            ..TrellisConfig::default()
        };

        config.save(&path).await.unwrap();
        assert_eq!(TrellisConfig::load(&path).await.unwrap(), config);
    }

    #[tokio::test]
    async fn load_rejects_unknown_policy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "parent-policy: sometimes\n").await.unwrap();

        let err = TrellisConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Yaml(_))));
    }

    #[test]
    fn find_root_walks_up_from_subdirectory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(TRELLIS_DIR_NAME)).unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_trellis_root(&nested).as_deref(), Some(dir.path()));
    }

    #[test]
    fn backend_joins_data_dir_to_root() {
        let config = TrellisConfig::default();
        assert_eq!(
            config.backend(Path::new("/work")),
            StorageBackend::Jsonl(PathBuf::from("/work/.trellis/data"))
        );
    }
}
