//! Application context for CLI command execution.
//!
//! [`App`] finds the workspace, loads its configuration, opens the store
//! once and wires the three services to it.
//!
//! # Example
//!
//! ```no_run
//! use trellis::app::App;
//! use std::path::Path;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::from_directory(Path::new(".")).await?;
//!     let ready = app.views().ready_to_start().await?;
//!     println!("{} task(s) ready", ready.len());
//!     Ok(())
//! }
//! ```

use crate::config::{find_trellis_root, TrellisConfig, CONFIG_FILE_NAME, TRELLIS_DIR_NAME};
use crate::domain::{EdgeKind, NewTask, Task, TaskId};
use crate::error::{ConfigError, Result};
use crate::relations::RelationshipService;
use crate::schedule::SchedulingViews;
use crate::storage::{create_store, GraphStore, StorageBackend};
use crate::tasks::TaskService;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Application context for CLI operations.
pub struct App {
    store: Arc<dyn GraphStore>,
    tasks: TaskService,
    relations: RelationshipService,
    views: SchedulingViews,
    config: TrellisConfig,
    root_dir: PathBuf,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root_dir", &self.root_dir)
            .field("config", &self.config)
            .field("store", &"<dyn GraphStore>")
            .finish()
    }
}

impl App {
    /// Create an App for the workspace containing `working_dir`.
    ///
    /// Searches up the directory tree for `.trellis/`, loads the
    /// configuration and opens the JSONL store it points to.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No trellis workspace is found in the directory tree
    /// - Configuration cannot be loaded
    /// - The data directory cannot be read
    pub async fn from_directory(working_dir: &Path) -> Result<Self> {
        let root_dir = find_trellis_root(working_dir).ok_or(ConfigError::NotInitialized)?;
        let config_path = root_dir.join(TRELLIS_DIR_NAME).join(CONFIG_FILE_NAME);
        let config = TrellisConfig::load(&config_path).await?;

        let store = create_store(config.backend(&root_dir)).await?;
        tracing::debug!(root = %root_dir.display(), "Opened trellis workspace");
        Ok(Self::with_store(store, config, root_dir))
    }

    /// An App over an ephemeral in-memory store.
    ///
    /// # Errors
    ///
    /// Only if the store cannot be created.
    pub async fn in_memory(config: TrellisConfig) -> Result<Self> {
        let store = create_store(StorageBackend::InMemory).await?;
        Ok(Self::with_store(store, config, PathBuf::new()))
    }

    fn with_store(store: Arc<dyn GraphStore>, config: TrellisConfig, root_dir: PathBuf) -> Self {
        let relations =
            RelationshipService::with_parent_policy(Arc::clone(&store), config.parent_policy);
        let tasks = TaskService::new(Arc::clone(&store)).with_hook(Arc::new(relations.clone()));
        let views = SchedulingViews::new(Arc::clone(&store));
        Self {
            store,
            tasks,
            relations,
            views,
            config,
            root_dir,
        }
    }

    /// Creates a task together with its dependencies and parents.
    ///
    /// Everything happens in one transaction: if any relation is rejected
    /// the task is not created either.
    ///
    /// # Errors
    ///
    /// Any validation error from the relationship service.
    pub async fn create_task(
        &self,
        new: NewTask,
        depends_on: &[TaskId],
        parents: &[TaskId],
    ) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let task = self.tasks.create_in(&mut *tx, new).await?;
        if !depends_on.is_empty() {
            self.relations
                .add_edges_in(&mut *tx, EdgeKind::Dependency, task.id, depends_on)
                .await?;
        }
        if !parents.is_empty() {
            self.relations
                .add_edges_in(&mut *tx, EdgeKind::Parent, task.id, parents)
                .await?;
        }
        tx.commit().await?;
        Ok(task)
    }

    /// The task service.
    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    /// The relationship service.
    pub fn relations(&self) -> &RelationshipService {
        &self.relations
    }

    /// The scheduling views, relative to today.
    pub fn views(&self) -> &SchedulingViews {
        &self.views
    }

    /// The loaded configuration.
    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    /// The workspace root (the directory containing `.trellis/`).
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }
}
