//! Error types for trellis operations.

use crate::domain::{EdgeKind, TaskId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The error type for trellis operations.
///
/// Validation variants carry the edge kind and the task ids involved so
/// callers can map them to their own responses.
#[derive(Debug, Error)]
pub enum Error {
    /// The task does not exist or has been soft-deleted.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// An edge from a task to itself was requested.
    #[error("Task {task} cannot be its own {kind}")]
    SelfReference {
        /// Edge set the request targeted
        kind: EdgeKind,
        /// The task
        task: TaskId,
    },

    /// Adding the edge would close a cycle in its edge set.
    #[error("Adding {kind} {task} -> {counterpart} would create a cycle")]
    CycleDetected {
        /// Edge set the request targeted
        kind: EdgeKind,
        /// Declaring task
        task: TaskId,
        /// Requested counterpart
        counterpart: TaskId,
    },

    /// The single-parent policy is in effect and the task already has one.
    #[error("Task {task} already has parent {existing}; cannot add parent {requested}")]
    ParentLimit {
        /// The child task
        task: TaskId,
        /// Its current parent
        existing: TaskId,
        /// The rejected parent
        requested: TaskId,
    },

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors related to workspace configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No `.trellis/` directory in the working directory or its ancestors.
    #[error("Not a trellis workspace (or any of the parent directories). Run 'trellis init' first.")]
    NotInitialized,

    /// `trellis init` found an existing workspace.
    #[error("Trellis is already initialized in {}", .0.display())]
    AlreadyInitialized(PathBuf),

    /// The configuration file could not be parsed or written.
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A configuration value is out of range.
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The offending key
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a JSONL table failed.
    #[error("Storage error: {0}")]
    Jsonl(#[from] trellis_jsonl::Error),

    /// A write referenced a task row that is not there.
    #[error("Storage error: no row for task {0}")]
    MissingRow(TaskId),

    /// Task ids are exhausted.
    #[error("Storage error: task id space exhausted")]
    IdOverflow,
}

/// A specialized Result type for trellis operations.
pub type Result<T> = std::result::Result<T, Error>;
