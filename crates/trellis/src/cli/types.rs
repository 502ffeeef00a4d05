//! CLI value enums and domain type conversions.

use clap::ValueEnum;
use serde::Serialize;

use crate::config::ParentPolicy;
use crate::domain::{Lifecycle, Progress, Task, TaskId};

/// Task progress for CLI arguments
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressArg {
    /// Not started
    Todo,
    /// Being worked on
    #[value(name = "in_progress", alias = "in-progress")]
    InProgress,
    /// Finished
    Done,
}

impl From<ProgressArg> for Progress {
    fn from(arg: ProgressArg) -> Self {
        match arg {
            ProgressArg::Todo => Self::Todo,
            ProgressArg::InProgress => Self::InProgress,
            ProgressArg::Done => Self::Done,
        }
    }
}

/// Task lifecycle for CLI arguments.
///
/// `deleted` is not offered; use `task soft-delete`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleArg {
    /// Visible in scheduling views
    Active,
    /// Parked, hidden from scheduling views
    Draft,
}

impl From<LifecycleArg> for Lifecycle {
    fn from(arg: LifecycleArg) -> Self {
        match arg {
            LifecycleArg::Active => Self::Active,
            LifecycleArg::Draft => Self::Draft,
        }
    }
}

/// Parent policy for `trellis init`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentPolicyArg {
    /// Any number of parents per task
    Multiple,
    /// At most one parent per task
    Single,
}

impl From<ParentPolicyArg> for ParentPolicy {
    fn from(arg: ParentPolicyArg) -> Self {
        match arg {
            ParentPolicyArg::Multiple => Self::Multiple,
            ParentPolicyArg::Single => Self::Single,
        }
    }
}

// ============================================================================
// Batch Results
// ============================================================================

/// A failed item of a batch command.
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    /// The task the command was applied to
    pub task_id: TaskId,
    /// Error message
    pub error: String,
}

/// Outcome of a command applied to several tasks independently.
///
/// Each task is committed on its own, so earlier successes stand even if a
/// later task fails.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    /// Tasks the command succeeded for
    pub succeeded: Vec<Task>,
    /// Tasks the command failed for
    pub failed: Vec<BatchError>,
}

impl BatchResult {
    /// An empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for one task.
    pub fn record(&mut self, task_id: TaskId, outcome: crate::error::Result<Task>) {
        match outcome {
            Ok(task) => self.succeeded.push(task),
            Err(e) => self.failed.push(BatchError {
                task_id,
                error: e.to_string(),
            }),
        }
    }

    /// Returns `true` if any task failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Number of tasks processed.
    #[must_use]
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}
