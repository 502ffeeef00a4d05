//! Command execution logic.
//!
//! This module contains the implementation of all CLI commands.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use super::args::{
    InitArgs, RelationAction, TaskAction, TaskAddArgs, TaskListArgs, TaskUpdateArgs, UpcomingArgs,
};
use super::types::BatchResult;
use crate::app::App;
use crate::domain::{EdgeKind, Lifecycle, NewTask, Progress, Task, TaskId, TaskUpdate};
use crate::output::{self, OutputConfig, OutputMode, Relations, TaskDetails, TreeNode};

/// Execute the init command
pub async fn execute_init(dir: &Path, args: &InitArgs, output_mode: OutputMode) -> Result<()> {
    use crate::commands::init;

    let result = init::init(dir, args.parent_policy.map(Into::into)).await?;

    match output_mode {
        OutputMode::Json => {
            output::print_json(&serde_json::json!({
                "trellis_dir": result.trellis_dir.display().to_string(),
                "config_file": result.config_file.display().to_string(),
                "data_dir": result.data_dir.display().to_string(),
                "config": result.config,
            }))?;
        }
        OutputMode::Text if !args.quiet => {
            println!("Initialized trellis in {}", result.trellis_dir.display());
            println!("  Config: {}", result.config_file.display());
            println!("  Data:   {}", result.data_dir.display());
            println!(
                "  Parent policy: {}",
                match result.config.parent_policy {
                    crate::config::ParentPolicy::Multiple => "multiple",
                    crate::config::ParentPolicy::Single => "single",
                }
            );
        }
        OutputMode::Text => {}
    }

    Ok(())
}

// ============================================================================
// Tasks
// ============================================================================

/// Execute a `task` subcommand
pub async fn execute_task(app: &App, action: &TaskAction, output_mode: OutputMode) -> Result<()> {
    match action {
        TaskAction::Add(args) => execute_task_add(app, args, output_mode).await,
        TaskAction::List(args) => execute_task_list(app, args, output_mode).await,
        TaskAction::Show { id } => execute_task_show(app, *id, output_mode).await,
        TaskAction::Update(args) => execute_task_update(app, args, output_mode).await,
        TaskAction::Progress { progress, ids } => {
            let progress = Progress::from(*progress);
            let mut result = BatchResult::new();
            for &id in ids {
                result.record(id, app.tasks().set_progress(id, progress).await);
            }
            finish_batch(&result, "Updated", output_mode)
        }
        TaskAction::SoftDelete { ids } => {
            let mut result = BatchResult::new();
            for &id in ids {
                result.record(id, app.tasks().soft_delete(id).await);
            }
            finish_batch(&result, "Soft-deleted", output_mode)
        }
        TaskAction::Delete { ids } => {
            let mut result = BatchResult::new();
            for &id in ids {
                result.record(id, app.tasks().hard_delete(id).await);
            }
            finish_batch(&result, "Deleted", output_mode)
        }
    }
}

async fn execute_task_add(app: &App, args: &TaskAddArgs, output_mode: OutputMode) -> Result<()> {
    if let (Some(start), Some(end)) = (args.start, args.end)
        && end < start
    {
        anyhow::bail!("Deadline {end} is before the planned start {start}");
    }

    let new = NewTask {
        title: args.title.clone(),
        progress: args.progress.into(),
        lifecycle: if args.draft {
            Lifecycle::Draft
        } else {
            Lifecycle::Active
        },
        start_date: args.start,
        end_date: args.end,
    };

    let task = app.create_task(new, &args.depends_on, &args.parents).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&task)?,
        OutputMode::Text => println!("Created task {}", task.id),
    }
    Ok(())
}

async fn execute_task_list(app: &App, args: &TaskListArgs, output_mode: OutputMode) -> Result<()> {
    let mut tasks = app.tasks().list(args.all).await?;
    if let Some(progress) = args.progress {
        let progress = Progress::from(progress);
        tasks.retain(|t| t.progress == progress);
    }
    tasks.truncate(args.limit);

    output::print_tasks("Tasks", &tasks, app.views().today(), output_mode)?;
    Ok(())
}

async fn execute_task_show(app: &App, id: TaskId, output_mode: OutputMode) -> Result<()> {
    let task = app.tasks().get(id).await?;
    let relations = app.relations();
    let details = TaskDetails {
        dependencies: relations.outgoing(EdgeKind::Dependency, id).await?,
        dependents: relations.incoming(EdgeKind::Dependency, id).await?,
        parents: relations.outgoing(EdgeKind::Parent, id).await?,
        children: relations.incoming(EdgeKind::Parent, id).await?,
        task,
    };

    output::print_task_details(&details, output_mode)?;
    Ok(())
}

async fn execute_task_update(
    app: &App,
    args: &TaskUpdateArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let date_change = |value: Option<chrono::NaiveDate>, clear: bool| match (value, clear) {
        (_, true) => Some(None),
        (Some(date), false) => Some(Some(date)),
        (None, false) => None,
    };

    let update = TaskUpdate {
        title: args.title.clone(),
        progress: None,
        lifecycle: args.lifecycle.map(Into::into),
        start_date: date_change(args.start, args.clear_start),
        end_date: date_change(args.end, args.clear_end),
    };

    if update.title.is_none()
        && update.lifecycle.is_none()
        && update.start_date.is_none()
        && update.end_date.is_none()
    {
        anyhow::bail!("Nothing to update. Pass at least one of --title, --lifecycle, --start, --end");
    }

    let task = app.tasks().update(args.id, update).await?;

    match output_mode {
        OutputMode::Json => output::print_json(&task)?,
        OutputMode::Text => println!("Updated task {}", task.id),
    }
    Ok(())
}

/// Print a batch result and fail if any task failed
fn finish_batch(result: &BatchResult, action: &str, output_mode: OutputMode) -> Result<()> {
    match output_mode {
        OutputMode::Json => output::print_json(result)?,
        OutputMode::Text => {
            if !result.succeeded.is_empty() {
                let ids: Vec<_> = result.succeeded.iter().map(|t| t.id.to_string()).collect();
                println!(
                    "{} {} task(s): {}",
                    action,
                    result.succeeded.len(),
                    ids.join(", ")
                );
            }
            if result.has_failures() {
                eprintln!("Failed {} task(s):", result.failed.len());
                for err in &result.failed {
                    eprintln!("  {}: {}", err.task_id, err.error);
                }
            }
        }
    }

    if result.has_failures() {
        anyhow::bail!(
            "{} of {} task(s) failed",
            result.failed.len(),
            result.total()
        );
    }
    Ok(())
}

// ============================================================================
// Relations
// ============================================================================

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Execute a `dep` or `parent` subcommand
pub async fn execute_relation(
    app: &App,
    kind: EdgeKind,
    action: &RelationAction,
    output_mode: OutputMode,
) -> Result<()> {
    let relations = app.relations();
    let config = OutputConfig::from_env();

    match action {
        RelationAction::Add { task, counterparts } => {
            relations.add_edges(kind, *task, counterparts).await?;
            print_change(output_mode, kind, *task, counterparts, || {
                output::success(
                    &format!("Added {kind} {task} -> {}", join_ids(counterparts)),
                    &config,
                )
            })
        }
        RelationAction::Rm { task, counterpart } => {
            relations.remove_edge(kind, *task, *counterpart).await?;
            print_change(output_mode, kind, *task, &[*counterpart], || {
                format!("Removed {kind} {task} -> {counterpart}")
            })
        }
        RelationAction::Clear { task } => {
            relations.remove_all_edges_of_kind(kind, *task).await?;
            print_change(output_mode, kind, *task, &[], || {
                format!("Cleared every {kind} of {task}")
            })
        }
        RelationAction::Set { task, counterparts } => {
            relations.replace_edges(kind, *task, counterparts).await?;
            print_change(output_mode, kind, *task, counterparts, || {
                if counterparts.is_empty() {
                    format!("Cleared every {kind} of {task}")
                } else {
                    format!("Set {kind} {task} -> {}", join_ids(counterparts))
                }
            })
        }
        RelationAction::List { task } => {
            let listing = Relations {
                kind,
                task: *task,
                outgoing: relations.outgoing(kind, *task).await?,
                incoming: relations.incoming(kind, *task).await?,
            };
            output::print_relations(&listing, output_mode)?;
            Ok(())
        }
        RelationAction::Tree { task, depth } => {
            let tree = build_tree(app, kind, *task, *depth).await?;
            output::print_tree(&tree, output_mode)?;
            Ok(())
        }
    }
}

fn print_change<F>(
    output_mode: OutputMode,
    kind: EdgeKind,
    task: TaskId,
    counterparts: &[TaskId],
    message: F,
) -> Result<()>
where
    F: FnOnce() -> String,
{
    match output_mode {
        OutputMode::Json => output::print_json(&serde_json::json!({
            "kind": kind,
            "task": task,
            "counterparts": counterparts,
        }))?,
        OutputMode::Text => println!("{}", message()),
    }
    Ok(())
}

async fn build_tree(
    app: &App,
    kind: EdgeKind,
    root: TaskId,
    max_depth: Option<usize>,
) -> Result<TreeNode> {
    let root_task = app.tasks().get(root).await?;
    let reached = app.relations().tree(kind, root, max_depth).await?;

    let mut ids: Vec<TaskId> = reached.iter().map(|entry| entry.id).collect();
    ids.push(root);
    let adjacency = app.relations().outgoing_for(kind, &ids).await?;

    let tasks: BTreeMap<TaskId, Task> = app
        .tasks()
        .list(true)
        .await?
        .into_iter()
        .filter(|t| ids.contains(&t.id))
        .map(|t| (t.id, t))
        .collect();

    Ok(TreeNode::build(&root_task, &adjacency, &tasks, max_depth))
}

// ============================================================================
// Scheduling views
// ============================================================================

/// Execute the ready command
pub async fn execute_ready(app: &App, output_mode: OutputMode) -> Result<()> {
    let tasks = app.views().ready_to_start().await?;
    output::print_tasks("Ready to start", &tasks, app.views().today(), output_mode)?;
    Ok(())
}

/// Execute the overdue command
pub async fn execute_overdue(app: &App, output_mode: OutputMode) -> Result<()> {
    let tasks = app.views().overdue().await?;
    output::print_tasks("Overdue", &tasks, app.views().today(), output_mode)?;
    Ok(())
}

/// Execute the upcoming command
pub async fn execute_upcoming(
    app: &App,
    args: &UpcomingArgs,
    output_mode: OutputMode,
) -> Result<()> {
    let days = args.days.unwrap_or(app.config().upcoming_days);
    let tasks = app.views().upcoming_deadlines(days).await?;
    let heading = format!("Due in the next {days} days");
    output::print_tasks(&heading, &tasks, app.views().today(), output_mode)?;
    Ok(())
}

/// Execute the focus command
pub async fn execute_focus(app: &App, output_mode: OutputMode) -> Result<()> {
    let tasks = app.views().today_focus().await?;
    output::print_tasks("Today's focus", &tasks, app.views().today(), output_mode)?;
    Ok(())
}

/// Execute the done-this-week command
pub async fn execute_done_this_week(app: &App, output_mode: OutputMode) -> Result<()> {
    let tasks = app.views().completed_this_week().await?;
    output::print_tasks(
        "Completed this week",
        &tasks,
        app.views().today(),
        output_mode,
    )?;
    Ok(())
}

/// Execute the agenda command
pub async fn execute_agenda(app: &App, output_mode: OutputMode) -> Result<()> {
    let agenda = app.views().agenda().await?;
    output::print_agenda(&agenda, app.views().today(), output_mode)?;
    Ok(())
}

/// Execute the stats command
pub async fn execute_stats(app: &App, output_mode: OutputMode) -> Result<()> {
    let stats = app.views().stats(app.config().upcoming_days).await?;
    output::print_stats(&stats, output_mode)?;
    Ok(())
}
