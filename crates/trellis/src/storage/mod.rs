//! Storage abstraction layer for trellis.
//!
//! Storage is split by concern so the services can ask only for what they
//! need:
//!
//! - [`TaskStore`] / [`TaskWriter`]: task rows (identity, status, dates)
//! - [`EdgeStore`] / [`EdgeWriter`]: the two edge sets, with no validation
//!   of their own
//! - [`GraphStore`]: the factory for [`Transaction`]s (exclusive, read-write)
//!   and [`Snapshot`]s (shared, read-only)
//!
//! # Transactions
//!
//! Every mutation of the relationship graph runs inside one transaction
//! that covers both the validation reads and the writes. Two concurrent
//! requests therefore cannot both pass validation against the same state.
//! A transaction that is dropped without [`Transaction::commit`] is rolled
//! back.
//!
//! # Example
//!
//! ```
//! use trellis::domain::{Edge, EdgeKind, NewTask};
//! use trellis::storage::{
//!     create_store, EdgeStore, EdgeWriter, GraphStore, StorageBackend, TaskWriter, Transaction,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> trellis::error::Result<()> {
//!     let store = create_store(StorageBackend::InMemory).await?;
//!
//!     let mut tx = store.begin().await?;
//!     let a = tx.insert_task(NewTask::titled("Pour foundation"), chrono::Utc::now()).await?;
//!     let b = tx.insert_task(NewTask::titled("Frame walls"), chrono::Utc::now()).await?;
//!     tx.insert_edge(EdgeKind::Dependency, Edge::new(b.id, a.id)).await?;
//!     tx.commit().await?;
//!
//!     let snapshot = store.snapshot().await?;
//!     assert_eq!(snapshot.outgoing(EdgeKind::Dependency, b.id).await?, vec![a.id]);
//!     Ok(())
//! }
//! ```

use crate::domain::{Edge, EdgeKind, NewTask, Task, TaskDates, TaskId, TaskStatus};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod memory;

pub use memory::{LoadWarning, MemoryStore};

/// Read access to task rows.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Get a task by id, including soft-deleted ones.
    ///
    /// Returns `None` if no row exists.
    async fn get_task(&self, id: TaskId) -> Result<Option<Task>>;

    /// Returns `true` if the task exists and is not soft-deleted.
    async fn task_exists(&self, id: TaskId) -> Result<bool> {
        Ok(self.get_task(id).await?.is_some_and(|task| task.is_live()))
    }

    /// Progress and lifecycle of a task, if it exists.
    async fn task_status(&self, id: TaskId) -> Result<Option<TaskStatus>> {
        Ok(self.get_task(id).await?.map(|task| task.status()))
    }

    /// Planned dates of a task, if it exists.
    async fn task_dates(&self, id: TaskId) -> Result<Option<TaskDates>> {
        Ok(self.get_task(id).await?.map(|task| task.dates()))
    }

    /// All task rows ordered by id, soft-deleted ones included.
    async fn list_tasks(&self) -> Result<Vec<Task>>;
}

/// Read access to the edge sets.
#[async_trait]
pub trait EdgeStore: Send + Sync {
    /// All edges of `kind`, sorted.
    async fn edges(&self, kind: EdgeKind) -> Result<Vec<Edge>>;

    /// Returns `true` if the exact edge is present.
    async fn contains_edge(&self, kind: EdgeKind, edge: Edge) -> Result<bool>;

    /// Counterparts of edges where `task` is the source, sorted.
    async fn outgoing(&self, kind: EdgeKind, task: TaskId) -> Result<Vec<TaskId>>;

    /// Sources of edges where `task` is the counterpart, sorted.
    async fn incoming(&self, kind: EdgeKind, task: TaskId) -> Result<Vec<TaskId>>;
}

/// Write access to task rows.
#[async_trait]
pub trait TaskWriter: Send {
    /// Stores a new task, allocating its id, and returns it.
    ///
    /// Both timestamps are set to `now`.
    async fn insert_task(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<Task>;

    /// Replaces an existing row with `task`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingRow` if no row has that id.
    async fn replace_task(&mut self, task: Task) -> Result<()>;

    /// Removes a row, returning it if it existed.
    ///
    /// Any edge still touching the task in either set is removed with it.
    /// Callers that need to act on those edges remove them first.
    async fn remove_task(&mut self, id: TaskId) -> Result<Option<Task>>;
}

/// Write access to the edge sets. Performs no validation.
#[async_trait]
pub trait EdgeWriter: Send {
    /// Inserts an edge. Returns `false` if it was already present.
    async fn insert_edge(&mut self, kind: EdgeKind, edge: Edge) -> Result<bool>;

    /// Removes an edge. Returns `false` if it was not present.
    async fn remove_edge(&mut self, kind: EdgeKind, edge: Edge) -> Result<bool>;

    /// Removes every edge of `kind` whose source is `task`.
    ///
    /// Returns the number of removed edges.
    async fn remove_outgoing(&mut self, kind: EdgeKind, task: TaskId) -> Result<usize>;

    /// Removes every edge of `kind` with `task` as either endpoint.
    ///
    /// Returns the number of removed edges.
    async fn remove_touching(&mut self, kind: EdgeKind, task: TaskId) -> Result<usize>;
}

/// An exclusive unit of work over tasks and edges.
///
/// Reads observe the transaction's own writes. Dropping the transaction
/// without committing discards every write made through it.
#[async_trait]
pub trait Transaction: TaskStore + EdgeStore + TaskWriter + EdgeWriter {
    /// Makes the writes permanent (and durable, for persistent stores).
    ///
    /// # Errors
    ///
    /// If persisting fails the writes are rolled back and the error is
    /// returned.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// A consistent read-only view of tasks and edges.
pub trait Snapshot: TaskStore + EdgeStore {}

/// Transaction factory over a task store and its edge sets.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Starts an exclusive read-write transaction.
    ///
    /// Waits until every other transaction and snapshot has finished.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Takes a shared read-only snapshot.
    async fn snapshot(&self) -> Result<Box<dyn Snapshot>>;
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// In-memory storage (ephemeral)
    InMemory,

    /// In-memory storage persisted as JSONL tables in a data directory
    Jsonl(PathBuf),
}

impl StorageBackend {
    /// Returns the data directory for file-based backends.
    #[must_use]
    pub fn data_dir(&self) -> Option<&Path> {
        match self {
            Self::Jsonl(dir) => Some(dir),
            Self::InMemory => None,
        }
    }
}

/// Create a store for the given backend.
///
/// For [`StorageBackend::Jsonl`] the tables are loaded resiliently: rows
/// that are malformed or would break a graph invariant are skipped and
/// logged as warnings, and the store is still usable.
///
/// # Errors
///
/// - `Error::Io` / `Error::Storage` if the data directory cannot be read
pub async fn create_store(backend: StorageBackend) -> Result<Arc<dyn GraphStore>> {
    match backend {
        StorageBackend::InMemory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Jsonl(dir) => {
            let (store, warnings) = MemoryStore::open(&dir).await?;
            for warning in &warnings {
                tracing::warn!(warning = %warning, "JSONL load warning");
            }
            Ok(Arc::new(store))
        }
    }
}
