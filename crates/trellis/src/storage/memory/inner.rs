//! Core in-memory data structures.
//!
//! `StoreInner` holds the task rows and one adjacency map per edge kind. It
//! is not thread-safe on its own; [`super::MemoryStore`] wraps it in an
//! `Arc<RwLock<_>>` and all access goes through a transaction or snapshot
//! guard.

use crate::domain::{Edge, EdgeKind, Task, TaskId};
use crate::error::{Result, StorageError};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::BTreeMap;

/// Edge direction in both graphs: declaring task -> counterpart.
pub(crate) struct StoreInner {
    /// Task rows by id. Ordered so listings and saved tables are stable.
    pub(super) tasks: BTreeMap<TaskId, Task>,

    /// `task -> depends_on`
    dependencies: DiGraphMap<TaskId, ()>,

    /// `task -> parent`
    parents: DiGraphMap<TaskId, ()>,

    /// Next id handed out by `allocate_id`.
    pub(super) next_id: u64,
}

impl StoreInner {
    pub(crate) fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            dependencies: DiGraphMap::new(),
            parents: DiGraphMap::new(),
            next_id: 1,
        }
    }

    pub(super) fn graph(&self, kind: EdgeKind) -> &DiGraphMap<TaskId, ()> {
        match kind {
            EdgeKind::Dependency => &self.dependencies,
            EdgeKind::Parent => &self.parents,
        }
    }

    fn graph_mut(&mut self, kind: EdgeKind) -> &mut DiGraphMap<TaskId, ()> {
        match kind {
            EdgeKind::Dependency => &mut self.dependencies,
            EdgeKind::Parent => &mut self.parents,
        }
    }

    // ========== Reads ==========

    pub(super) fn get_task(&self, id: TaskId) -> Option<Task> {
        self.tasks.get(&id).cloned()
    }

    pub(super) fn list_tasks(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    pub(super) fn edges(&self, kind: EdgeKind) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self
            .graph(kind)
            .all_edges()
            .map(|(task, other, _)| Edge::new(task, other))
            .collect();
        edges.sort_unstable();
        edges
    }

    pub(super) fn contains_edge(&self, kind: EdgeKind, edge: Edge) -> bool {
        self.graph(kind).contains_edge(edge.task, edge.other)
    }

    pub(super) fn neighbors(&self, kind: EdgeKind, task: TaskId, dir: Direction) -> Vec<TaskId> {
        let graph = self.graph(kind);
        if !graph.contains_node(task) {
            return Vec::new();
        }
        let mut ids: Vec<TaskId> = graph.neighbors_directed(task, dir).collect();
        ids.sort_unstable();
        ids
    }

    // ========== Raw writes (no journaling) ==========

    pub(super) fn allocate_id(&mut self) -> Result<TaskId> {
        let id = TaskId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or(StorageError::IdOverflow)?;
        Ok(id)
    }

    /// Inserts or replaces a row, returning the previous one.
    pub(super) fn put_task(&mut self, task: Task) -> Option<Task> {
        self.tasks.insert(task.id, task)
    }

    /// Removes a row and its node in both graphs, with any edges still on it.
    pub(super) fn take_task(&mut self, id: TaskId) -> Option<Task> {
        for kind in EdgeKind::ALL {
            self.graph_mut(kind).remove_node(id);
        }
        self.tasks.remove(&id)
    }

    /// Returns `true` if the edge was not present before.
    pub(super) fn add_edge(&mut self, kind: EdgeKind, edge: Edge) -> bool {
        self.graph_mut(kind)
            .add_edge(edge.task, edge.other, ())
            .is_none()
    }

    /// Returns `true` if the edge was present.
    pub(super) fn drop_edge(&mut self, kind: EdgeKind, edge: Edge) -> bool {
        self.graph_mut(kind)
            .remove_edge(edge.task, edge.other)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lifecycle, Progress};
    use chrono::{TimeZone, Utc};

    fn task(id: u64) -> Task {
        let at = Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap();
        Task {
            id: TaskId(id),
            title: format!("task {id}"),
            progress: Progress::Todo,
            lifecycle: Lifecycle::Active,
            start_date: None,
            end_date: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn edges_come_back_sorted() {
        let mut inner = StoreInner::new();
        inner.add_edge(EdgeKind::Parent, Edge::new(TaskId(3), TaskId(1)));
        inner.add_edge(EdgeKind::Parent, Edge::new(TaskId(2), TaskId(1)));

        assert_eq!(
            inner.edges(EdgeKind::Parent),
            vec![Edge::new(TaskId(2), TaskId(1)), Edge::new(TaskId(3), TaskId(1))]
        );
        assert!(inner.edges(EdgeKind::Dependency).is_empty());
    }

    #[test]
    fn add_and_drop_report_presence() {
        let mut inner = StoreInner::new();
        let edge = Edge::new(TaskId(1), TaskId(2));

        assert!(inner.add_edge(EdgeKind::Dependency, edge));
        assert!(!inner.add_edge(EdgeKind::Dependency, edge));
        assert!(inner.drop_edge(EdgeKind::Dependency, edge));
        assert!(!inner.drop_edge(EdgeKind::Dependency, edge));
    }

    #[test]
    fn neighbors_of_unknown_task_is_empty() {
        let inner = StoreInner::new();
        assert!(
            inner
                .neighbors(EdgeKind::Dependency, TaskId(5), Direction::Incoming)
                .is_empty()
        );
    }

    #[test]
    fn take_task_drops_the_node_from_both_graphs() {
        let mut inner = StoreInner::new();
        for id in 1..=3 {
            inner.put_task(task(id));
        }
        inner.add_edge(EdgeKind::Dependency, Edge::new(TaskId(2), TaskId(1)));
        inner.add_edge(EdgeKind::Parent, Edge::new(TaskId(3), TaskId(1)));

        assert!(inner.take_task(TaskId(1)).is_some());

        for kind in EdgeKind::ALL {
            assert!(!inner.graph(kind).contains_node(TaskId(1)));
            assert!(inner.edges(kind).is_empty());
        }
        assert!(inner.graph(EdgeKind::Dependency).contains_node(TaskId(2)));
        assert!(inner.take_task(TaskId(1)).is_none());
    }

    #[test]
    fn allocate_id_is_monotonic() {
        let mut inner = StoreInner::new();
        assert_eq!(inner.allocate_id().unwrap(), TaskId(1));
        assert_eq!(inner.allocate_id().unwrap(), TaskId(2));

        inner.next_id = u64::MAX;
        assert!(inner.allocate_id().is_err());
    }
}
