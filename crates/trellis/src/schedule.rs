//! Scheduling View Engine: derived task lists for planning a day.
//!
//! Every view reads one [`Snapshot`](crate::storage::Snapshot) and returns
//! tasks; nothing here writes. Only active tasks ever appear (drafts and
//! soft-deleted tasks are ignored).
//!
//! "Today" is the local calendar date unless pinned with
//! [`SchedulingViews::at`]. A pinned view also reads timestamps as UTC
//! dates, so its results do not depend on the machine's timezone.

use crate::domain::{EdgeKind, Lifecycle, Progress, Task, TaskId};
use crate::error::Result;
use crate::storage::{EdgeStore, GraphStore, TaskStore};
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// The dashboard composite of the three "what now" lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agenda {
    /// [`SchedulingViews::today_focus`]
    pub focus: Vec<Task>,
    /// [`SchedulingViews::ready_to_start`]
    pub ready: Vec<Task>,
    /// [`SchedulingViews::overdue`]
    pub overdue: Vec<Task>,
}

/// Progress breakdown of active tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounts {
    /// Not started
    pub todo: usize,
    /// Started
    pub in_progress: usize,
    /// Finished
    pub done: usize,
}

/// Lifecycle breakdown of all task rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LifecycleCounts {
    /// Active tasks
    pub active: usize,
    /// Drafts
    pub draft: usize,
    /// Soft-deleted tasks
    pub deleted: usize,
}

/// Summary counts for the whole workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// Number of active tasks
    pub total_active: usize,
    /// Progress of active tasks
    pub progress: ProgressCounts,
    /// Lifecycle of all tasks
    pub lifecycle: LifecycleCounts,
    /// Size of the upcoming-deadlines view
    pub upcoming: usize,
    /// Window used for `upcoming`, in days
    pub upcoming_days: u32,
    /// Size of the overdue view
    pub overdue: usize,
    /// Size of the completed-this-week view
    pub completed_this_week: usize,
}

/// Read-only scheduling queries.
#[derive(Clone)]
pub struct SchedulingViews {
    store: Arc<dyn GraphStore>,
    pinned: Option<NaiveDate>,
}

impl std::fmt::Debug for SchedulingViews {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulingViews")
            .field("pinned", &self.pinned)
            .finish_non_exhaustive()
    }
}

/// The first day of the current week.
///
/// The most recent Sunday strictly before `today`; on a Sunday that is
/// the Sunday a week ago.
#[must_use]
pub fn week_start(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday().num_days_from_sunday() {
        0 => 7,
        n => n,
    };
    today - Days::new(u64::from(back))
}

/// Ascending by date with missing dates last.
fn cmp_dates_missing_last(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn is_open(task: &Task) -> bool {
    task.is_active() && !task.is_done()
}

impl SchedulingViews {
    /// Views over `store`, relative to the local date.
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store,
            pinned: None,
        }
    }

    /// Pins "today" to `date`.
    #[must_use]
    pub fn at(mut self, date: NaiveDate) -> Self {
        self.pinned = Some(date);
        self
    }

    /// The date the views are computed for.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.pinned.unwrap_or_else(|| Local::now().date_naive())
    }

    fn date_of(&self, timestamp: DateTime<Utc>) -> NaiveDate {
        match self.pinned {
            Some(_) => timestamp.date_naive(),
            None => timestamp.with_timezone(&Local).date_naive(),
        }
    }

    async fn tasks(&self) -> Result<Vec<Task>> {
        self.store.snapshot().await?.list_tasks().await
    }

    /// Active, not-started tasks whose dependencies are all done.
    ///
    /// Newest first.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn ready_to_start(&self) -> Result<Vec<Task>> {
        let snapshot = self.store.snapshot().await?;
        let tasks = snapshot.list_tasks().await?;
        let done: HashSet<TaskId> = tasks.iter().filter(|t| t.is_done()).map(|t| t.id).collect();

        let mut blocked = HashSet::new();
        for edge in snapshot.edges(EdgeKind::Dependency).await? {
            if !done.contains(&edge.other) {
                blocked.insert(edge.task);
            }
        }

        let mut ready: Vec<Task> = tasks
            .into_iter()
            .filter(|t| t.is_active() && t.progress == Progress::Todo && !blocked.contains(&t.id))
            .collect();
        ready.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(ready)
    }

    /// Active, unfinished tasks whose deadline has passed. Earliest first.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn overdue(&self) -> Result<Vec<Task>> {
        let today = self.today();
        let mut tasks: Vec<Task> = self
            .tasks()
            .await?
            .into_iter()
            .filter(|t| is_open(t) && t.end_date.is_some_and(|end| end < today))
            .collect();
        tasks.sort_by_key(|t| (t.end_date, t.id));
        Ok(tasks)
    }

    /// Active, unfinished tasks due within the next `days` days, today
    /// included. Earliest first.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn upcoming_deadlines(&self, days: u32) -> Result<Vec<Task>> {
        let today = self.today();
        let horizon = today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        let mut tasks: Vec<Task> = self
            .tasks()
            .await?
            .into_iter()
            .filter(|t| is_open(t) && t.end_date.is_some_and(|end| (today..=horizon).contains(&end)))
            .collect();
        tasks.sort_by_key(|t| (t.end_date, t.id));
        Ok(tasks)
    }

    /// Active, unfinished tasks scheduled for today.
    ///
    /// A task qualifies when today lies within its start and end dates. A
    /// missing bound is open on that side; a task with neither date never
    /// qualifies. Ordered by end date, then start date, missing dates last.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn today_focus(&self) -> Result<Vec<Task>> {
        let today = self.today();
        let mut tasks: Vec<Task> = self
            .tasks()
            .await?
            .into_iter()
            .filter(|t| {
                is_open(t)
                    && match (t.start_date, t.end_date) {
                        (None, None) => false,
                        (start, end) => {
                            start.is_none_or(|s| s <= today) && end.is_none_or(|e| today <= e)
                        }
                    }
            })
            .collect();
        tasks.sort_by(|a, b| {
            cmp_dates_missing_last(a.end_date, b.end_date)
                .then_with(|| cmp_dates_missing_last(a.start_date, b.start_date))
                .then(a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    /// Active tasks finished since the start of the week. Latest first.
    ///
    /// "Finished at" is the last update of a done task.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn completed_this_week(&self) -> Result<Vec<Task>> {
        let since = week_start(self.today());
        let mut tasks: Vec<Task> = self
            .tasks()
            .await?
            .into_iter()
            .filter(|t| t.is_active() && t.is_done() && self.date_of(t.updated_at) >= since)
            .collect();
        tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    /// Focus, ready and overdue lists in one call.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn agenda(&self) -> Result<Agenda> {
        Ok(Agenda {
            focus: self.today_focus().await?,
            ready: self.ready_to_start().await?,
            overdue: self.overdue().await?,
        })
    }

    /// Workspace counts, with `upcoming_days` as the deadline window.
    ///
    /// # Errors
    ///
    /// Storage errors only.
    pub async fn stats(&self, upcoming_days: u32) -> Result<Stats> {
        let tasks = self.tasks().await?;

        let mut progress = ProgressCounts::default();
        let mut lifecycle = LifecycleCounts::default();
        for task in &tasks {
            match task.lifecycle {
                Lifecycle::Active => lifecycle.active += 1,
                Lifecycle::Draft => lifecycle.draft += 1,
                Lifecycle::Deleted => lifecycle.deleted += 1,
            }
            if task.is_active() {
                match task.progress {
                    Progress::Todo => progress.todo += 1,
                    Progress::InProgress => progress.in_progress += 1,
                    Progress::Done => progress.done += 1,
                }
            }
        }

        Ok(Stats {
            total_active: lifecycle.active,
            progress,
            lifecycle,
            upcoming: self.upcoming_deadlines(upcoming_days).await?.len(),
            upcoming_days,
            overdue: self.overdue().await?.len(),
            completed_this_week: self.completed_this_week().await?.len(),
        })
    }
}
