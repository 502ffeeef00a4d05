//! In-memory store with optional JSONL persistence.
//!
//! All state lives in a [`StoreInner`] behind `Arc<RwLock<_>>`:
//!
//! - `BTreeMap<TaskId, Task>` for task rows
//! - one `petgraph::graphmap::DiGraphMap<TaskId, ()>` per edge kind
//!
//! # Persistence
//!
//! [`MemoryStore::new`] is ephemeral. [`MemoryStore::open`] loads a data
//! directory and then writes the three tables back on every commit that
//! changed something, while still holding the write lock. The tables are
//! replaced as one batch. If that write fails the transaction is rolled
//! back and the tables are left as they were, so memory and disk never
//! disagree.
//!
//! # Thread Safety
//!
//! [`GraphStore::begin`] takes an owned write guard for the whole
//! transaction; [`GraphStore::snapshot`] takes an owned read guard. Writers
//! are therefore fully serialized and never observe each other's partial
//! state.

mod inner;
mod jsonl;
mod transaction;

use crate::error::Result;
use crate::storage::{GraphStore, Snapshot, Transaction};
use async_trait::async_trait;
use inner::StoreInner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use transaction::{MemorySnapshot, MemoryTransaction};

pub use jsonl::{
    edge_file_name, LoadWarning, DEPENDENCIES_FILE_NAME, PARENTS_FILE_NAME, TASKS_FILE_NAME,
};

/// Thread-safe in-memory store.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<StoreInner>>,
    data_dir: Option<PathBuf>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("data_dir", &self.data_dir)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty, ephemeral store.
    ///
    /// ```
    /// use trellis::storage::{GraphStore, MemoryStore, TaskStore};
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() {
    ///     let store = MemoryStore::new();
    ///     let snapshot = store.snapshot().await.unwrap();
    ///     assert!(snapshot.list_tasks().await.unwrap().is_empty());
    /// }
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::new())),
            data_dir: None,
        }
    }

    /// Load a store from `data_dir` and persist every commit back to it.
    ///
    /// Returns the store together with the rows that were skipped while
    /// loading. The directory does not have to exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing table cannot be read.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<(Self, Vec<LoadWarning>)> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let (inner, warnings) = jsonl::load_tables(&data_dir).await?;
        let store = Self {
            inner: Arc::new(RwLock::new(inner)),
            data_dir: Some(data_dir),
        };
        Ok((store, warnings))
    }

    /// The data directory, if the store is persistent.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.inner).write_owned().await;
        Ok(Box::new(MemoryTransaction::new(guard, self.data_dir.clone())))
    }

    async fn snapshot(&self) -> Result<Box<dyn Snapshot>> {
        let guard = Arc::clone(&self.inner).read_owned().await;
        Ok(Box::new(MemorySnapshot::new(guard)))
    }
}
