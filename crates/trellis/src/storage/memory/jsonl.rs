//! JSONL persistence for the in-memory store.
//!
//! A data directory holds one table per file:
//!
//! | file                 | row                                     |
//! |----------------------|-----------------------------------------|
//! | `tasks.jsonl`        | a serialized [`Task`]                   |
//! | `dependencies.jsonl` | `{"task_id": N, "other_task_id": M}`    |
//! | `parents.jsonl`      | `{"task_id": N, "other_task_id": M}`    |
//!
//! Rows are written sorted, so saving an unchanged store produces
//! byte-identical files.

use super::inner::StoreInner;
use crate::domain::{Edge, EdgeKind, Task, TaskId};
use crate::error::{Result, StorageError};
use crate::graph::would_create_cycle;
use std::fmt;
use std::path::Path;
use trellis_jsonl::{read_jsonl_resilient, AtomicBatch, Warning as JsonlWarning};

/// Name of the task table
pub const TASKS_FILE_NAME: &str = "tasks.jsonl";

/// Name of the dependency edge table
pub const DEPENDENCIES_FILE_NAME: &str = "dependencies.jsonl";

/// Name of the parent edge table
pub const PARENTS_FILE_NAME: &str = "parents.jsonl";

/// File name of the table holding edges of `kind`.
#[must_use]
pub fn edge_file_name(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::Dependency => DEPENDENCIES_FILE_NAME,
        EdgeKind::Parent => PARENTS_FILE_NAME,
    }
}

/// Non-fatal problems found while loading a data directory.
///
/// The offending row is skipped; everything else is loaded. Every rule a
/// live mutation enforces is re-checked here, so a hand-edited table can
/// never produce a store that violates a graph invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// A line that could not be parsed
    MalformedLine {
        /// Table file name
        table: &'static str,
        /// 1-based line number
        line_number: usize,
        /// Parser message
        error: String,
    },

    /// A task row with an id that is invalid or already used
    InvalidTask {
        /// The id on the row
        id: TaskId,
        /// What is wrong with it
        reason: &'static str,
    },

    /// An edge whose endpoint has no task row
    OrphanedEdge {
        /// Edge set
        kind: EdgeKind,
        /// The skipped edge
        edge: Edge,
    },

    /// An edge from a task to itself
    SelfLoop {
        /// Edge set
        kind: EdgeKind,
        /// The task
        task: TaskId,
    },

    /// A second copy of an edge already loaded
    DuplicateEdge {
        /// Edge set
        kind: EdgeKind,
        /// The skipped edge
        edge: Edge,
    },

    /// An edge that would close a cycle with edges loaded before it
    CircularEdge {
        /// Edge set
        kind: EdgeKind,
        /// The skipped edge
        edge: Edge,
    },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedLine {
                table,
                line_number,
                error,
            } => write!(f, "{table} line {line_number}: {error}"),
            Self::InvalidTask { id, reason } => write!(f, "skipped task {id}: {reason}"),
            Self::OrphanedEdge { kind, edge } => {
                write!(f, "skipped {kind} edge {edge}: endpoint does not exist")
            }
            Self::SelfLoop { kind, task } => {
                write!(f, "skipped {kind} edge {task} -> {task}: self-reference")
            }
            Self::DuplicateEdge { kind, edge } => write!(f, "skipped duplicate {kind} edge {edge}"),
            Self::CircularEdge { kind, edge } => {
                write!(f, "skipped {kind} edge {edge}: would create a cycle")
            }
        }
    }
}

async fn read_table<T>(dir: &Path, table: &'static str, warnings: &mut Vec<LoadWarning>) -> Result<Vec<T>>
where
    T: serde::de::DeserializeOwned,
{
    let path = dir.join(table);
    if !tokio::fs::try_exists(&path).await? {
        return Ok(Vec::new());
    }

    let (rows, jsonl_warnings) = read_jsonl_resilient::<T, _>(&path)
        .await
        .map_err(StorageError::from)?;

    warnings.extend(jsonl_warnings.into_iter().map(|warning| {
        let error = match &warning {
            JsonlWarning::MalformedJson { error, .. } => error.clone(),
            JsonlWarning::SkippedLine { reason, .. } => reason.clone(),
        };
        LoadWarning::MalformedLine {
            table,
            line_number: warning.line_number(),
            error,
        }
    }));

    Ok(rows)
}

/// Load a store from a data directory.
///
/// Missing table files are treated as empty. Loading runs in three passes:
///
/// 1. parse every table, skipping malformed lines
/// 2. insert task rows, skipping id 0 and repeated ids
/// 3. insert edges in file order, skipping orphans, self-loops, duplicates
///    and any edge that would close a cycle with the edges before it
///
/// # Errors
///
/// Returns an error only if a table exists but cannot be read.
pub(crate) async fn load_tables(dir: &Path) -> Result<(StoreInner, Vec<LoadWarning>)> {
    let mut warnings = Vec::new();

    let tasks: Vec<Task> = read_table(dir, TASKS_FILE_NAME, &mut warnings).await?;
    let mut edge_rows = Vec::with_capacity(EdgeKind::ALL.len());
    for kind in EdgeKind::ALL {
        let rows: Vec<Edge> = read_table(dir, edge_file_name(kind), &mut warnings).await?;
        edge_rows.push((kind, rows));
    }

    let mut inner = StoreInner::new();
    for task in tasks {
        if task.id.get() == 0 {
            warnings.push(LoadWarning::InvalidTask {
                id: task.id,
                reason: "task ids start at 1",
            });
            continue;
        }
        if inner.tasks.contains_key(&task.id) {
            warnings.push(LoadWarning::InvalidTask {
                id: task.id,
                reason: "duplicate task id",
            });
            continue;
        }
        inner.next_id = inner.next_id.max(task.id.get().saturating_add(1));
        inner.put_task(task);
    }

    for (kind, rows) in edge_rows {
        for edge in rows {
            if !inner.tasks.contains_key(&edge.task) || !inner.tasks.contains_key(&edge.other) {
                warnings.push(LoadWarning::OrphanedEdge { kind, edge });
            } else if edge.task == edge.other {
                warnings.push(LoadWarning::SelfLoop {
                    kind,
                    task: edge.task,
                });
            } else if inner.contains_edge(kind, edge) {
                warnings.push(LoadWarning::DuplicateEdge { kind, edge });
            } else if would_create_cycle(
                inner.graph(kind).all_edges().map(|(a, b, _)| (a, b)),
                edge.task,
                edge.other,
            ) {
                warnings.push(LoadWarning::CircularEdge { kind, edge });
            } else {
                inner.add_edge(kind, edge);
            }
        }
    }

    tracing::debug!(
        dir = %dir.display(),
        tasks = inner.tasks.len(),
        warnings = warnings.len(),
        "Loaded JSONL tables"
    );

    Ok((inner, warnings))
}

/// Write all three tables as one atomic batch.
///
/// Every temp file is written before any table is replaced, and a failed
/// replace puts the earlier tables back, so the files on disk always agree
/// with each other.
pub(crate) async fn save_tables(inner: &StoreInner, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    let mut batch = AtomicBatch::new();
    if let Err(e) = stage_tables(&mut batch, inner, dir).await {
        batch.discard().await;
        return Err(StorageError::from(e).into());
    }
    batch.commit().await.map_err(StorageError::from)?;

    tracing::trace!(dir = %dir.display(), tasks = inner.tasks.len(), "Saved JSONL tables");
    Ok(())
}

async fn stage_tables(
    batch: &mut AtomicBatch,
    inner: &StoreInner,
    dir: &Path,
) -> trellis_jsonl::Result<()> {
    batch
        .stage(dir.join(TASKS_FILE_NAME), inner.tasks.values())
        .await?;
    for kind in EdgeKind::ALL {
        batch.stage(dir.join(edge_file_name(kind)), inner.edges(kind)).await?;
    }
    Ok(())
}
