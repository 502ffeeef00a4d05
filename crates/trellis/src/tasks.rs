//! Task Service: thin CRUD over the task rows.
//!
//! Edges are not this service's business, with one exception: a hard delete
//! runs every registered [`DeletionHook`] in the same transaction before the
//! row goes away. [`RelationshipService`](crate::relations::RelationshipService)
//! is such a hook and removes the task's edges.

use crate::domain::{Lifecycle, NewTask, Progress, Task, TaskId, TaskUpdate};
use crate::error::{Error, Result};
use crate::storage::{GraphStore, TaskStore, Transaction};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Work that must happen before a task row is hard-deleted.
#[async_trait]
pub trait DeletionHook: Send + Sync {
    /// Called inside the delete transaction. An error aborts the delete.
    async fn before_hard_delete(&self, tx: &mut dyn Transaction, task: TaskId) -> Result<()>;
}

/// Creates, updates and deletes task rows.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn GraphStore>,
    hooks: Vec<Arc<dyn DeletionHook>>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("hooks", &self.hooks.len())
            .finish_non_exhaustive()
    }
}

impl TaskService {
    /// Service without deletion hooks.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            hooks: Vec::new(),
        }
    }

    /// Registers a hook to run before every hard delete, in order.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn DeletionHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Creates a task.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn create(&self, new: NewTask) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let task = self.create_in(&mut *tx, new).await?;
        tx.commit().await?;
        Ok(task)
    }

    /// [`create`](Self::create) within the caller's transaction.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn create_in(&self, tx: &mut dyn Transaction, new: NewTask) -> Result<Task> {
        let task = tx.insert_task(new, Utc::now()).await?;
        tracing::debug!(task = %task.id, title = %task.title, "Created task");
        Ok(task)
    }

    /// Gets a task, including a soft-deleted one.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if no row exists.
    pub async fn get(&self, id: TaskId) -> Result<Task> {
        let snapshot = self.store.snapshot().await?;
        snapshot.get_task(id).await?.ok_or(Error::TaskNotFound(id))
    }

    /// All tasks ordered by id. Soft-deleted tasks only on request.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn list(&self, include_deleted: bool) -> Result<Vec<Task>> {
        let snapshot = self.store.snapshot().await?;
        let mut tasks = snapshot.list_tasks().await?;
        if !include_deleted {
            tasks.retain(Task::is_live);
        }
        Ok(tasks)
    }

    /// Applies a partial update. `updated_at` only moves if something changed.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if no row exists.
    pub async fn update(&self, id: TaskId, update: TaskUpdate) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let mut task = tx.get_task(id).await?.ok_or(Error::TaskNotFound(id))?;
        if update.apply_to(&mut task) {
            task.updated_at = Utc::now();
            tx.replace_task(task.clone()).await?;
            tx.commit().await?;
            tracing::debug!(task = %id, "Updated task");
        }
        Ok(task)
    }

    /// Shorthand for an update that only sets progress.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if no row exists.
    pub async fn set_progress(&self, id: TaskId, progress: Progress) -> Result<Task> {
        self.update(
            id,
            TaskUpdate {
                progress: Some(progress),
                ..TaskUpdate::default()
            },
        )
        .await
    }

    /// Marks a task deleted. Its edges stay in place.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if no row exists.
    pub async fn soft_delete(&self, id: TaskId) -> Result<Task> {
        self.update(
            id,
            TaskUpdate {
                lifecycle: Some(Lifecycle::Deleted),
                ..TaskUpdate::default()
            },
        )
        .await
    }

    /// Removes a task row for good, after running the deletion hooks.
    ///
    /// Hooks and the removal share one transaction: if any step fails
    /// nothing is removed.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if no row exists, or the first hook error.
    pub async fn hard_delete(&self, id: TaskId) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        if tx.get_task(id).await?.is_none() {
            return Err(Error::TaskNotFound(id));
        }

        for hook in &self.hooks {
            hook.before_hard_delete(&mut *tx, id).await?;
        }

        let task = tx
            .remove_task(id)
            .await?
            .ok_or(Error::TaskNotFound(id))?;
        tx.commit().await?;
        tracing::info!(task = %id, "Hard-deleted task");
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Edge, EdgeKind};
    use crate::relations::RelationshipService;
    use crate::storage::{EdgeStore, MemoryStore};

    fn service() -> (TaskService, RelationshipService) {
        let store: Arc<dyn GraphStore> = Arc::new(MemoryStore::new());
        let relations = RelationshipService::new(Arc::clone(&store));
        let tasks = TaskService::new(store).with_hook(Arc::new(relations.clone()));
        (tasks, relations)
    }

    struct Refuse;

    #[async_trait]
    impl DeletionHook for Refuse {
        async fn before_hard_delete(&self, _tx: &mut dyn Transaction, task: TaskId) -> Result<()> {
            Err(Error::TaskNotFound(task))
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let (tasks, _) = service();
        let a = tasks.create(NewTask::titled("a")).await.unwrap();
        let b = tasks.create(NewTask::titled("b")).await.unwrap();

        assert_eq!(a.id, TaskId(1));
        assert_eq!(b.id, TaskId(2));
        assert_eq!(a.created_at, a.updated_at);
        assert_eq!(tasks.get(b.id).await.unwrap(), b);
    }

    #[tokio::test]
    async fn update_without_change_keeps_timestamp() {
        let (tasks, _) = service();
        let task = tasks.create(NewTask::titled("a")).await.unwrap();

        let same = tasks.set_progress(task.id, Progress::Todo).await.unwrap();
        assert_eq!(same.updated_at, task.updated_at);

        let started = tasks.set_progress(task.id, Progress::InProgress).await.unwrap();
        assert_eq!(started.progress, Progress::InProgress);
        assert!(started.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn soft_delete_hides_task_but_keeps_edges() {
        let (tasks, relations) = service();
        let a = tasks.create(NewTask::titled("a")).await.unwrap();
        let b = tasks.create(NewTask::titled("b")).await.unwrap();
        relations.add_edge(EdgeKind::Dependency, a.id, b.id).await.unwrap();

        let deleted = tasks.soft_delete(b.id).await.unwrap();
        assert_eq!(deleted.lifecycle, Lifecycle::Deleted);
        assert_eq!(tasks.list(false).await.unwrap(), vec![a.clone()]);
        assert_eq!(tasks.list(true).await.unwrap().len(), 2);
        assert_eq!(
            relations.outgoing(EdgeKind::Dependency, a.id).await.unwrap(),
            vec![b.id]
        );
    }

    #[tokio::test]
    async fn hard_delete_cascades_edges() {
        let (tasks, relations) = service();
        let a = tasks.create(NewTask::titled("a")).await.unwrap();
        let b = tasks.create(NewTask::titled("b")).await.unwrap();
        let c = tasks.create(NewTask::titled("c")).await.unwrap();
        relations.add_edge(EdgeKind::Dependency, a.id, b.id).await.unwrap();
        relations.add_edge(EdgeKind::Parent, b.id, c.id).await.unwrap();
        relations.add_edge(EdgeKind::Parent, a.id, c.id).await.unwrap();

        tasks.hard_delete(b.id).await.unwrap();

        assert!(matches!(tasks.get(b.id).await, Err(Error::TaskNotFound(_))));
        let snapshot = tasks.store.snapshot().await.unwrap();
        assert!(snapshot.edges(EdgeKind::Dependency).await.unwrap().is_empty());
        assert_eq!(
            snapshot.edges(EdgeKind::Parent).await.unwrap(),
            vec![Edge::new(a.id, c.id)]
        );
    }

    #[tokio::test]
    async fn failing_hook_aborts_delete() {
        let (tasks, relations) = service();
        let tasks = tasks.with_hook(Arc::new(Refuse));
        let a = tasks.create(NewTask::titled("a")).await.unwrap();
        let b = tasks.create(NewTask::titled("b")).await.unwrap();
        relations.add_edge(EdgeKind::Dependency, a.id, b.id).await.unwrap();

        assert!(tasks.hard_delete(b.id).await.is_err());

        // The relationship hook already ran, but its removals were rolled back.
        assert_eq!(tasks.get(b.id).await.unwrap(), b);
        assert_eq!(
            relations.outgoing(EdgeKind::Dependency, a.id).await.unwrap(),
            vec![b.id]
        );
    }

    #[tokio::test]
    async fn missing_task_is_reported() {
        let (tasks, _) = service();
        assert!(matches!(
            tasks.hard_delete(TaskId(9)).await,
            Err(Error::TaskNotFound(TaskId(9)))
        ));
        assert!(matches!(
            tasks.soft_delete(TaskId(9)).await,
            Err(Error::TaskNotFound(TaskId(9)))
        ));
    }
}
