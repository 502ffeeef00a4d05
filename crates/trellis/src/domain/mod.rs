//! Domain types for the task relationship graph.
//!
//! A [`Task`] is a node. Two independent edge sets connect tasks:
//!
//! - **Dependency** edges: `task -> depends_on`. The task is not ready to
//!   start until every task it depends on is done.
//! - **Parent** edges: `task -> parent`. The task is a structural child of
//!   the parent.
//!
//! Both edge sets point from the declaring task to its counterpart, so
//! "outgoing" means dependencies/parents and "incoming" means
//! dependents/children. Each set is kept acyclic on its own; nothing
//! constrains how the two sets relate to each other.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Unique identifier for a task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Returns the raw numeric id.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for TaskId {
    type Err = ParseIntError;

    /// Accepts `12` as well as `#12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.strip_prefix('#').unwrap_or(s).parse().map(Self)
    }
}

/// How far along a task is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    /// Not started
    #[default]
    Todo,

    /// Being worked on
    InProgress,

    /// Finished
    Done,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        })
    }
}

/// Whether a task is live, parked, or soft-deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    /// Visible in every view
    #[default]
    Active,

    /// Exists but is excluded from scheduling views
    Draft,

    /// Soft-deleted: excluded from views and cannot gain new edges
    Deleted,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Deleted => "deleted",
        })
    }
}

/// A task node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Short title
    pub title: String,

    /// Current progress
    pub progress: Progress,

    /// Current lifecycle state
    pub lifecycle: Lifecycle,

    /// First day work is planned
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Deadline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Returns `true` unless the task has been soft-deleted.
    ///
    /// Only live tasks may appear as an endpoint of a newly added edge.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.lifecycle != Lifecycle::Deleted
    }

    /// Returns `true` if the task is active (not draft, not deleted).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    /// Returns `true` if the task is done.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.progress == Progress::Done
    }

    /// Progress and lifecycle of the task.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        TaskStatus {
            progress: self.progress,
            lifecycle: self.lifecycle,
        }
    }

    /// Planned start and end dates of the task.
    #[must_use]
    pub fn dates(&self) -> TaskDates {
        TaskDates {
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// Status pair as seen by the relationship graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaskStatus {
    /// Progress
    pub progress: Progress,
    /// Lifecycle
    pub lifecycle: Lifecycle,
}

/// Optional planned dates of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaskDates {
    /// Start date, if planned
    pub start: Option<NaiveDate>,
    /// End date (deadline), if planned
    pub end: Option<NaiveDate>,
}

/// Data for creating a new task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    /// Title
    pub title: String,

    /// Initial progress
    pub progress: Progress,

    /// Initial lifecycle
    pub lifecycle: Lifecycle,

    /// Planned start
    pub start_date: Option<NaiveDate>,

    /// Planned end
    pub end_date: Option<NaiveDate>,
}

impl NewTask {
    /// An active, not-started task with the given title and no dates.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Partial update of a task. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    /// New title
    pub title: Option<String>,

    /// New progress
    pub progress: Option<Progress>,

    /// New lifecycle
    pub lifecycle: Option<Lifecycle>,

    /// New start date (`Some(None)` clears it)
    pub start_date: Option<Option<NaiveDate>>,

    /// New end date (`Some(None)` clears it)
    pub end_date: Option<Option<NaiveDate>>,
}

impl TaskUpdate {
    /// Applies the update in place. Returns `true` if anything changed.
    pub fn apply_to(self, task: &mut Task) -> bool {
        let before = task.clone();
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(lifecycle) = self.lifecycle {
            task.lifecycle = lifecycle;
        }
        if let Some(start) = self.start_date {
            task.start_date = start;
        }
        if let Some(end) = self.end_date {
            task.end_date = end;
        }
        *task != before
    }
}

/// Which of the two edge sets an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// `task` depends on `other`
    Dependency,
    /// `task` is a child of `other`
    Parent,
}

impl EdgeKind {
    /// Both kinds, in a fixed order.
    pub const ALL: [Self; 2] = [Self::Dependency, Self::Parent];

    /// Noun for the counterpart of an outgoing edge ("dependency", "parent").
    #[must_use]
    pub fn counterpart_noun(self) -> &'static str {
        match self {
            Self::Dependency => "dependency",
            Self::Parent => "parent",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dependency => "dependency",
            Self::Parent => "parent",
        })
    }
}

/// A directed edge `task -> other` within one edge set.
///
/// Serialized as `{"task_id": N, "other_task_id": M}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// The declaring task (dependent / child)
    #[serde(rename = "task_id")]
    pub task: TaskId,

    /// The counterpart (dependency / parent)
    #[serde(rename = "other_task_id")]
    pub other: TaskId,
}

impl Edge {
    /// Creates an edge `task -> other`.
    #[must_use]
    pub fn new(task: TaskId, other: TaskId) -> Self {
        Self { task, other }
    }

    /// Returns `true` if `id` is either endpoint.
    #[must_use]
    pub fn touches(&self, id: TaskId) -> bool {
        self.task == id || self.other == id
    }

    /// The edge as a `(source, target)` pair.
    #[must_use]
    pub fn pair(&self) -> (TaskId, TaskId) {
        (self.task, self.other)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.task, self.other)
    }
}

/// One entry of a transitive relation walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    /// Reached task
    pub id: TaskId,
    /// Number of edges from the starting task (1 = direct)
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("7", 7)]
    #[case("#42", 42)]
    #[case("  #3 ", 3)]
    fn task_id_parses_with_or_without_hash(#[case] input: &str, #[case] expected: u64) {
        assert_eq!(input.parse::<TaskId>().unwrap(), TaskId(expected));
    }

    #[rstest]
    #[case("")]
    #[case("#")]
    #[case("-1")]
    #[case("abc")]
    fn task_id_rejects_garbage(#[case] input: &str) {
        assert!(input.parse::<TaskId>().is_err());
    }

    #[test]
    fn progress_and_lifecycle_use_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&Progress::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::from_str::<Lifecycle>("\"draft\"").unwrap(),
            Lifecycle::Draft
        );
    }

    #[test]
    fn edge_row_format() {
        let edge = Edge::new(TaskId(2), TaskId(1));
        assert_eq!(
            serde_json::to_string(&edge).unwrap(),
            r#"{"task_id":2,"other_task_id":1}"#
        );
        assert!(edge.touches(TaskId(1)));
        assert!(!edge.touches(TaskId(3)));
    }

    #[test]
    fn update_reports_whether_anything_changed() {
        let now = Utc::now();
        let mut task = Task {
            id: TaskId(1),
            title: "Draft agenda".to_string(),
            progress: Progress::Todo,
            lifecycle: Lifecycle::Active,
            start_date: None,
            end_date: NaiveDate::from_ymd_opt(2026, 10, 20),
            created_at: now,
            updated_at: now,
        };

        let unchanged = TaskUpdate {
            progress: Some(Progress::Todo),
            ..TaskUpdate::default()
        };
        assert!(!unchanged.apply_to(&mut task));

        let cleared = TaskUpdate {
            end_date: Some(None),
            ..TaskUpdate::default()
        };
        assert!(cleared.apply_to(&mut task));
        assert_eq!(task.end_date, None);
    }
}
