//! Guarded access to [`StoreInner`]: journaled transactions and snapshots.

use super::inner::StoreInner;
use super::jsonl;
use crate::domain::{Edge, EdgeKind, NewTask, Task, TaskId};
use crate::error::{Result, StorageError};
use crate::storage::{EdgeStore, EdgeWriter, Snapshot, TaskStore, TaskWriter, Transaction};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use petgraph::Direction;
use std::path::PathBuf;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard};

/// Inverse of one write, replayed newest-first on rollback.
#[derive(Debug)]
enum Undo {
    TaskInserted { id: TaskId, prev_next_id: u64 },
    TaskReplaced(Task),
    TaskRemoved(Task),
    EdgeInserted(EdgeKind, Edge),
    EdgeRemoved(EdgeKind, Edge),
}

/// Exclusive read-write access to the store.
///
/// Holds the write guard until committed or dropped. Every write pushes its
/// inverse onto the journal; dropping without commit replays the journal.
pub(crate) struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<StoreInner>,
    journal: Vec<Undo>,
    data_dir: Option<PathBuf>,
    committed: bool,
}

impl MemoryTransaction {
    pub(super) fn new(guard: OwnedRwLockWriteGuard<StoreInner>, data_dir: Option<PathBuf>) -> Self {
        Self {
            guard,
            journal: Vec::new(),
            data_dir,
            committed: false,
        }
    }

    fn rollback(&mut self) {
        let inner = &mut *self.guard;
        while let Some(undo) = self.journal.pop() {
            match undo {
                Undo::TaskInserted { id, prev_next_id } => {
                    inner.take_task(id);
                    inner.next_id = prev_next_id;
                }
                Undo::TaskReplaced(previous) | Undo::TaskRemoved(previous) => {
                    inner.put_task(previous);
                }
                Undo::EdgeInserted(kind, edge) => {
                    inner.drop_edge(kind, edge);
                }
                Undo::EdgeRemoved(kind, edge) => {
                    inner.add_edge(kind, edge);
                }
            }
        }
    }

    fn remove_matching(&mut self, kind: EdgeKind, matches: impl Fn(&Edge) -> bool) -> usize {
        let doomed: Vec<Edge> = self
            .guard
            .edges(kind)
            .into_iter()
            .filter(|edge| matches(edge))
            .collect();
        for edge in &doomed {
            self.guard.drop_edge(kind, *edge);
            self.journal.push(Undo::EdgeRemoved(kind, *edge));
        }
        doomed.len()
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        if !self.committed && !self.journal.is_empty() {
            tracing::debug!(writes = self.journal.len(), "Rolling back uncommitted transaction");
            self.rollback();
        }
    }
}

/// Shared read-only access to the store.
pub(crate) struct MemorySnapshot {
    guard: OwnedRwLockReadGuard<StoreInner>,
}

impl MemorySnapshot {
    pub(super) fn new(guard: OwnedRwLockReadGuard<StoreInner>) -> Self {
        Self { guard }
    }
}

impl Snapshot for MemorySnapshot {}

/// Both guard types deref to `StoreInner`; the read traits are identical.
macro_rules! impl_reads {
    ($ty:ty) => {
        #[async_trait]
        impl TaskStore for $ty {
            async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
                Ok(self.guard.get_task(id))
            }

            async fn list_tasks(&self) -> Result<Vec<Task>> {
                Ok(self.guard.list_tasks())
            }
        }

        #[async_trait]
        impl EdgeStore for $ty {
            async fn edges(&self, kind: EdgeKind) -> Result<Vec<Edge>> {
                Ok(self.guard.edges(kind))
            }

            async fn contains_edge(&self, kind: EdgeKind, edge: Edge) -> Result<bool> {
                Ok(self.guard.contains_edge(kind, edge))
            }

            async fn outgoing(&self, kind: EdgeKind, task: TaskId) -> Result<Vec<TaskId>> {
                Ok(self.guard.neighbors(kind, task, Direction::Outgoing))
            }

            async fn incoming(&self, kind: EdgeKind, task: TaskId) -> Result<Vec<TaskId>> {
                Ok(self.guard.neighbors(kind, task, Direction::Incoming))
            }
        }
    };
}

impl_reads!(MemoryTransaction);
impl_reads!(MemorySnapshot);

#[async_trait]
impl TaskWriter for MemoryTransaction {
    async fn insert_task(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let prev_next_id = self.guard.next_id;
        let id = self.guard.allocate_id()?;
        let task = Task {
            id,
            title: new.title,
            progress: new.progress,
            lifecycle: new.lifecycle,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: now,
            updated_at: now,
        };
        self.guard.put_task(task.clone());
        self.journal.push(Undo::TaskInserted { id, prev_next_id });
        Ok(task)
    }

    async fn replace_task(&mut self, task: Task) -> Result<()> {
        if !self.guard.tasks.contains_key(&task.id) {
            return Err(StorageError::MissingRow(task.id).into());
        }
        if let Some(previous) = self.guard.put_task(task) {
            self.journal.push(Undo::TaskReplaced(previous));
        }
        Ok(())
    }

    async fn remove_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        if !self.guard.tasks.contains_key(&id) {
            return Ok(None);
        }
        // Journal any edges left on the task before its nodes go.
        for kind in EdgeKind::ALL {
            self.remove_matching(kind, |edge| edge.touches(id));
        }
        let removed = self.guard.take_task(id);
        if let Some(task) = &removed {
            self.journal.push(Undo::TaskRemoved(task.clone()));
        }
        Ok(removed)
    }
}

#[async_trait]
impl EdgeWriter for MemoryTransaction {
    async fn insert_edge(&mut self, kind: EdgeKind, edge: Edge) -> Result<bool> {
        let inserted = self.guard.add_edge(kind, edge);
        if inserted {
            self.journal.push(Undo::EdgeInserted(kind, edge));
        }
        Ok(inserted)
    }

    async fn remove_edge(&mut self, kind: EdgeKind, edge: Edge) -> Result<bool> {
        let removed = self.guard.drop_edge(kind, edge);
        if removed {
            self.journal.push(Undo::EdgeRemoved(kind, edge));
        }
        Ok(removed)
    }

    async fn remove_outgoing(&mut self, kind: EdgeKind, task: TaskId) -> Result<usize> {
        Ok(self.remove_matching(kind, |edge| edge.task == task))
    }

    async fn remove_touching(&mut self, kind: EdgeKind, task: TaskId) -> Result<usize> {
        Ok(self.remove_matching(kind, |edge| edge.touches(task)))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(mut self: Box<Self>) -> Result<()> {
        if !self.journal.is_empty()
            && let Some(dir) = self.data_dir.clone()
        {
            let saved = jsonl::save_tables(&self.guard, &dir).await;
            if let Err(e) = saved {
                self.rollback();
                return Err(e);
            }
        }
        self.committed = true;
        Ok(())
    }
}
