//! Implementation of the `init` command.
//!
//! Creates the `.trellis/` directory with a configuration file and an empty
//! data directory holding the three JSONL tables.

use crate::config::{ParentPolicy, TrellisConfig, CONFIG_FILE_NAME, TRELLIS_DIR_NAME};
use crate::error::{ConfigError, Result};
use crate::storage::memory::{DEPENDENCIES_FILE_NAME, PARENTS_FILE_NAME, TASKS_FILE_NAME};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Name of the gitignore file within .trellis
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";

/// Result of the init command
#[derive(Debug)]
pub struct InitResult {
    /// Path to the created trellis directory
    pub trellis_dir: PathBuf,
    /// Path to the created config file
    pub config_file: PathBuf,
    /// Path to the created data directory
    pub data_dir: PathBuf,
    /// The configuration that was written
    pub config: TrellisConfig,
}

/// Initialize a new trellis workspace in `base_dir`.
///
/// `parent_policy` defaults to [`ParentPolicy::Multiple`].
///
/// # Errors
///
/// Returns an error if:
/// - `.trellis/` already exists
/// - File system operations fail
pub async fn init(base_dir: &Path, parent_policy: Option<ParentPolicy>) -> Result<InitResult> {
    let trellis_dir = base_dir.join(TRELLIS_DIR_NAME);

    if fs::try_exists(&trellis_dir).await? {
        return Err(ConfigError::AlreadyInitialized(base_dir.to_path_buf()).into());
    }

    fs::create_dir_all(&trellis_dir).await?;

    let config = TrellisConfig {
        parent_policy: parent_policy.unwrap_or_default(),
        ..TrellisConfig::default()
    };
    let config_file = trellis_dir.join(CONFIG_FILE_NAME);
    config.save(&config_file).await?;

    let data_dir = base_dir.join(&config.data_dir);
    fs::create_dir_all(&data_dir).await?;
    for table in [TASKS_FILE_NAME, DEPENDENCIES_FILE_NAME, PARENTS_FILE_NAME] {
        fs::write(data_dir.join(table), "").await?;
    }

    let gitignore_content = "\
# The data directory should be tracked for collaboration.
# Temporary files from interrupted atomic writes should not.
*.tmp
";
    fs::write(trellis_dir.join(GITIGNORE_FILE_NAME), gitignore_content).await?;

    tracing::info!(dir = %trellis_dir.display(), "Initialized trellis workspace");

    Ok(InitResult {
        trellis_dir,
        config_file,
        data_dir,
        config,
    })
}
