//! Relationship Service: validated mutation of the two edge sets.
//!
//! Every add goes through the same checks, in this order:
//!
//! 1. both tasks exist and are not soft-deleted (`TaskNotFound`, the
//!    declaring task is checked first)
//! 2. the task is not its own counterpart (`SelfReference`)
//! 3. the counterpart does not already reach the task (`CycleDetected`)
//! 4. an identical edge is a no-op
//! 5. under [`ParentPolicy::Single`], a task keeps at most one parent
//!    (`ParentLimit`)
//!
//! Validation and writes share one [`Transaction`], so two requests that
//! would only form a cycle together cannot both succeed.
//!
//! The public methods each open and commit their own transaction. The
//! `*_in` variants take the caller's transaction instead, for work that
//! must be atomic with other writes (creating a task together with its
//! relations, cascading a hard delete).

use crate::config::ParentPolicy;
use crate::domain::{Edge, EdgeKind, Task, TaskId, TreeEntry};
use crate::error::{Error, Result};
use crate::graph::{reachable, would_create_cycle};
use crate::storage::{EdgeStore, GraphStore, TaskStore, Transaction};
use crate::tasks::DeletionHook;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validates and applies dependency and parent edges.
#[derive(Clone)]
pub struct RelationshipService {
    store: Arc<dyn GraphStore>,
    parent_policy: ParentPolicy,
}

impl std::fmt::Debug for RelationshipService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationshipService")
            .field("parent_policy", &self.parent_policy)
            .field("store", &"<dyn GraphStore>")
            .finish()
    }
}

/// Resolve a live task or fail with `TaskNotFound`.
async fn require_live(store: &(impl TaskStore + ?Sized), id: TaskId) -> Result<Task> {
    match store.get_task(id).await? {
        Some(task) if task.is_live() => Ok(task),
        _ => Err(Error::TaskNotFound(id)),
    }
}

/// Check each candidate `task -> c` in order, self-reference before cycle.
async fn check_candidates(
    store: &(impl EdgeStore + ?Sized),
    kind: EdgeKind,
    task: TaskId,
    counterparts: &[TaskId],
) -> Result<()> {
    // Every candidate starts at `task`, so a path back to `task` can never
    // run through another candidate. Checking each one against the existing
    // edges is enough.
    let edges: Vec<(TaskId, TaskId)> = store.edges(kind).await?.iter().map(Edge::pair).collect();
    for &counterpart in counterparts {
        if counterpart == task {
            return Err(Error::SelfReference { kind, task });
        }
        if would_create_cycle(edges.iter().copied(), task, counterpart) {
            return Err(Error::CycleDetected {
                kind,
                task,
                counterpart,
            });
        }
    }
    Ok(())
}

impl RelationshipService {
    /// Service with the default (multi-parent) policy.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_parent_policy(store, ParentPolicy::default())
    }

    /// Service with an explicit parent policy.
    pub fn with_parent_policy(store: Arc<dyn GraphStore>, parent_policy: ParentPolicy) -> Self {
        Self {
            store,
            parent_policy,
        }
    }

    /// The configured parent policy.
    #[must_use]
    pub fn parent_policy(&self) -> ParentPolicy {
        self.parent_policy
    }

    // ========== Mutations ==========

    /// Add `task -> counterpart` to the `kind` edge set.
    ///
    /// Adding an edge that already exists succeeds without writing.
    ///
    /// # Errors
    ///
    /// `TaskNotFound`, `SelfReference`, `CycleDetected` or `ParentLimit`;
    /// nothing is written in any of these cases.
    pub async fn add_edge(&self, kind: EdgeKind, task: TaskId, counterpart: TaskId) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let current = self.add_edge_in(&mut *tx, kind, task, counterpart).await?;
        tx.commit().await?;
        Ok(current)
    }

    /// [`add_edge`](Self::add_edge) within the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`add_edge`](Self::add_edge).
    pub async fn add_edge_in(
        &self,
        tx: &mut dyn Transaction,
        kind: EdgeKind,
        task: TaskId,
        counterpart: TaskId,
    ) -> Result<Task> {
        let current = require_live(&*tx, task).await?;
        require_live(&*tx, counterpart).await?;
        check_candidates(&*tx, kind, task, &[counterpart]).await?;
        self.insert_validated(tx, kind, task, counterpart).await?;
        Ok(current)
    }

    /// Add several edges from `task` at once.
    ///
    /// All ids are resolved and all candidates validated before the first
    /// insert, so either every edge is added or none is.
    ///
    /// # Errors
    ///
    /// The first `TaskNotFound`, `SelfReference`, `CycleDetected` or
    /// `ParentLimit` encountered.
    pub async fn add_edges(
        &self,
        kind: EdgeKind,
        task: TaskId,
        counterparts: &[TaskId],
    ) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let current = self.add_edges_in(&mut *tx, kind, task, counterparts).await?;
        tx.commit().await?;
        Ok(current)
    }

    /// [`add_edges`](Self::add_edges) within the caller's transaction.
    ///
    /// # Errors
    ///
    /// See [`add_edges`](Self::add_edges).
    pub async fn add_edges_in(
        &self,
        tx: &mut dyn Transaction,
        kind: EdgeKind,
        task: TaskId,
        counterparts: &[TaskId],
    ) -> Result<Task> {
        let current = require_live(&*tx, task).await?;
        for &counterpart in counterparts {
            require_live(&*tx, counterpart).await?;
        }
        check_candidates(&*tx, kind, task, counterparts).await?;
        for &counterpart in counterparts {
            self.insert_validated(tx, kind, task, counterpart).await?;
        }
        Ok(current)
    }

    /// Atomically replace the outgoing `kind` edges of `task`.
    ///
    /// Unlike separate remove and add calls, a failed validation leaves the
    /// old edges in place. This is also the way to move a task to a new
    /// parent under the single-parent policy.
    ///
    /// # Errors
    ///
    /// See [`add_edges`](Self::add_edges).
    pub async fn replace_edges(
        &self,
        kind: EdgeKind,
        task: TaskId,
        counterparts: &[TaskId],
    ) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        require_live(&*tx, task).await?;
        let removed = tx.remove_outgoing(kind, task).await?;
        let current = self.add_edges_in(&mut *tx, kind, task, counterparts).await?;
        tx.commit().await?;
        tracing::debug!(%kind, %task, removed, added = counterparts.len(), "Replaced edges");
        Ok(current)
    }

    /// Remove `task -> counterpart`. Removing an absent edge is a no-op.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if `task` does not resolve. The counterpart may be
    /// missing, so edges to a soft-deleted task can still be cleaned up.
    pub async fn remove_edge(
        &self,
        kind: EdgeKind,
        task: TaskId,
        counterpart: TaskId,
    ) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let current = require_live(&*tx, task).await?;
        let removed = tx.remove_edge(kind, Edge::new(task, counterpart)).await?;
        tx.commit().await?;
        tracing::debug!(%kind, %task, %counterpart, removed, "Removed edge");
        Ok(current)
    }

    /// Remove every outgoing `kind` edge of `task`.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if `task` does not resolve.
    pub async fn remove_all_edges_of_kind(&self, kind: EdgeKind, task: TaskId) -> Result<Task> {
        let mut tx = self.store.begin().await?;
        let current = require_live(&*tx, task).await?;
        let removed = tx.remove_outgoing(kind, task).await?;
        tx.commit().await?;
        tracing::debug!(%kind, %task, removed, "Removed all outgoing edges");
        Ok(current)
    }

    /// Remove every edge of both kinds that has `task` as either endpoint.
    ///
    /// Runs inside the caller's transaction; used before a hard delete.
    /// Returns the number of removed edges.
    ///
    /// # Errors
    ///
    /// Only storage errors.
    pub async fn cascade_delete_for_task(
        &self,
        tx: &mut dyn Transaction,
        task: TaskId,
    ) -> Result<usize> {
        let mut removed = 0;
        for kind in EdgeKind::ALL {
            removed += tx.remove_touching(kind, task).await?;
        }
        tracing::info!(%task, removed, "Cascaded edge removal");
        Ok(removed)
    }

    // ========== Validation ==========

    /// Check candidates `task -> c` for self-reference and cycles without
    /// writing. Fails on the first violating candidate.
    ///
    /// Reads a snapshot, so it never waits on other readers. Does not check
    /// existence.
    ///
    /// # Errors
    ///
    /// `SelfReference` or `CycleDetected`.
    pub async fn validate_batch(
        &self,
        kind: EdgeKind,
        task: TaskId,
        counterparts: &[TaskId],
    ) -> Result<()> {
        let snapshot = self.store.snapshot().await?;
        check_candidates(&*snapshot, kind, task, counterparts).await
    }

    async fn insert_validated(
        &self,
        tx: &mut dyn Transaction,
        kind: EdgeKind,
        task: TaskId,
        counterpart: TaskId,
    ) -> Result<()> {
        let edge = Edge::new(task, counterpart);
        if tx.contains_edge(kind, edge).await? {
            tracing::debug!(%kind, %task, %counterpart, "Edge already present");
            return Ok(());
        }

        if kind == EdgeKind::Parent
            && self.parent_policy == ParentPolicy::Single
            && let Some(&existing) = tx.outgoing(kind, task).await?.first()
        {
            return Err(Error::ParentLimit {
                task,
                existing,
                requested: counterpart,
            });
        }

        tx.insert_edge(kind, edge).await?;
        tracing::debug!(%kind, %task, %counterpart, "Added edge");
        Ok(())
    }

    // ========== Reads ==========

    /// Counterparts of `task`'s outgoing edges (its dependencies or parents).
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if the task has no row.
    pub async fn outgoing(&self, kind: EdgeKind, task: TaskId) -> Result<Vec<TaskId>> {
        let snapshot = self.store.snapshot().await?;
        if snapshot.get_task(task).await?.is_none() {
            return Err(Error::TaskNotFound(task));
        }
        snapshot.outgoing(kind, task).await
    }

    /// Sources of edges pointing at `task` (its dependents or children).
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if the task has no row.
    pub async fn incoming(&self, kind: EdgeKind, task: TaskId) -> Result<Vec<TaskId>> {
        let snapshot = self.store.snapshot().await?;
        if snapshot.get_task(task).await?.is_none() {
            return Err(Error::TaskNotFound(task));
        }
        snapshot.incoming(kind, task).await
    }

    /// Outgoing counterparts for several tasks at once.
    ///
    /// Unknown ids map to an empty list.
    ///
    /// # Errors
    ///
    /// Only storage errors.
    pub async fn outgoing_for(
        &self,
        kind: EdgeKind,
        tasks: &[TaskId],
    ) -> Result<BTreeMap<TaskId, Vec<TaskId>>> {
        let snapshot = self.store.snapshot().await?;
        let mut map = BTreeMap::new();
        for &task in tasks {
            map.insert(task, snapshot.outgoing(kind, task).await?);
        }
        Ok(map)
    }

    /// Transitive closure of `task`'s outgoing edges, breadth-first.
    ///
    /// For dependencies this is everything that must be done before
    /// `task`; for parents, all of its ancestors.
    ///
    /// # Errors
    ///
    /// `TaskNotFound` if the task has no row.
    pub async fn tree(
        &self,
        kind: EdgeKind,
        task: TaskId,
        max_depth: Option<usize>,
    ) -> Result<Vec<TreeEntry>> {
        let snapshot = self.store.snapshot().await?;
        if snapshot.get_task(task).await?.is_none() {
            return Err(Error::TaskNotFound(task));
        }
        let edges = snapshot.edges(kind).await?;
        Ok(reachable(edges.iter().map(Edge::pair), task, max_depth)
            .into_iter()
            .map(|(id, depth)| TreeEntry { id, depth })
            .collect())
    }
}

#[async_trait]
impl DeletionHook for RelationshipService {
    async fn before_hard_delete(&self, tx: &mut dyn Transaction, task: TaskId) -> Result<()> {
        self.cascade_delete_for_task(tx, task).await.map(|_| ())
    }
}
