//! CLI argument structs for all commands.
//!
//! Each command has its own argument struct with clap derive attributes
//! for parsing and validation.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use super::types::{LifecycleArg, ParentPolicyArg, ProgressArg};
use super::validators::{parse_date, parse_days, parse_task_id, validate_title};
use crate::domain::TaskId;

/// Arguments for the `init` command
#[derive(Parser, Debug, Clone)]
pub struct InitArgs {
    /// How many parents a task may have
    #[arg(long, value_enum)]
    pub parent_policy: Option<ParentPolicyArg>,

    /// Suppress output messages
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the `task` command
#[derive(Parser, Debug, Clone)]
pub struct TaskArgs {
    /// Task action to perform
    #[command(subcommand)]
    pub action: TaskAction,
}

/// Task subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskAction {
    /// Create a new task
    Add(TaskAddArgs),

    /// List tasks
    List(TaskListArgs),

    /// Show a task with its relations
    Show {
        /// Task ID
        #[arg(value_parser = parse_task_id)]
        id: TaskId,
    },

    /// Change title, lifecycle or dates of a task
    Update(TaskUpdateArgs),

    /// Set the progress of one or more tasks
    Progress {
        /// New progress
        #[arg(value_enum)]
        progress: ProgressArg,

        /// Task IDs
        #[arg(required = true, num_args = 1.., value_parser = parse_task_id)]
        ids: Vec<TaskId>,
    },

    /// Mark tasks deleted, keeping their rows and relations
    SoftDelete {
        /// Task IDs
        #[arg(required = true, num_args = 1.., value_parser = parse_task_id)]
        ids: Vec<TaskId>,
    },

    /// Remove tasks and every relation that touches them
    Delete {
        /// Task IDs
        #[arg(required = true, num_args = 1.., value_parser = parse_task_id)]
        ids: Vec<TaskId>,
    },
}

/// Arguments for `task add`
#[derive(Parser, Debug, Clone)]
pub struct TaskAddArgs {
    /// Task title (maximum 200 characters)
    #[arg(value_parser = validate_title)]
    pub title: String,

    /// Initial progress
    #[arg(short, long, value_enum, default_value = "todo")]
    pub progress: ProgressArg,

    /// Create the task as a draft
    #[arg(long)]
    pub draft: bool,

    /// Planned start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start: Option<NaiveDate>,

    /// Deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end: Option<NaiveDate>,

    /// Tasks the new task depends on (comma-separated IDs)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_task_id)]
    pub depends_on: Vec<TaskId>,

    /// Parents of the new task (comma-separated IDs)
    #[arg(long = "parent", value_delimiter = ',', value_parser = parse_task_id)]
    pub parents: Vec<TaskId>,
}

/// Arguments for `task list`
#[derive(Parser, Debug, Clone)]
pub struct TaskListArgs {
    /// Filter by progress
    #[arg(short, long, value_enum)]
    pub progress: Option<ProgressArg>,

    /// Include soft-deleted tasks
    #[arg(long)]
    pub all: bool,

    /// Maximum number of tasks to display
    #[arg(short = 'n', long, default_value = "100")]
    pub limit: usize,
}

/// Arguments for `task update`
#[derive(Parser, Debug, Clone)]
pub struct TaskUpdateArgs {
    /// Task ID
    #[arg(value_parser = parse_task_id)]
    pub id: TaskId,

    /// New title
    #[arg(long, value_parser = validate_title)]
    pub title: Option<String>,

    /// New lifecycle
    #[arg(long, value_enum)]
    pub lifecycle: Option<LifecycleArg>,

    /// New planned start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_start")]
    pub start: Option<NaiveDate>,

    /// Remove the planned start
    #[arg(long)]
    pub clear_start: bool,

    /// New deadline (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_end")]
    pub end: Option<NaiveDate>,

    /// Remove the deadline
    #[arg(long)]
    pub clear_end: bool,
}

/// Arguments for the `dep` and `parent` commands
#[derive(Parser, Debug, Clone)]
pub struct RelationArgs {
    /// Relation action to perform
    #[command(subcommand)]
    pub action: RelationAction,
}

/// Relation subcommands, shared by both edge kinds
#[derive(Subcommand, Debug, Clone)]
pub enum RelationAction {
    /// Add relations from a task (all or nothing)
    Add {
        /// Declaring task
        #[arg(value_parser = parse_task_id)]
        task: TaskId,

        /// Counterparts
        #[arg(required = true, num_args = 1.., value_parser = parse_task_id)]
        counterparts: Vec<TaskId>,
    },

    /// Remove one relation
    Rm {
        /// Declaring task
        #[arg(value_parser = parse_task_id)]
        task: TaskId,

        /// Counterpart
        #[arg(value_parser = parse_task_id)]
        counterpart: TaskId,
    },

    /// Remove every relation declared by a task
    Clear {
        /// Declaring task
        #[arg(value_parser = parse_task_id)]
        task: TaskId,
    },

    /// Replace the relations declared by a task
    Set {
        /// Declaring task
        #[arg(value_parser = parse_task_id)]
        task: TaskId,

        /// New counterparts (none clears)
        #[arg(value_parser = parse_task_id)]
        counterparts: Vec<TaskId>,
    },

    /// List relations in both directions
    List {
        /// Task ID
        #[arg(value_parser = parse_task_id)]
        task: TaskId,
    },

    /// Show the transitive relation tree
    Tree {
        /// Root task
        #[arg(value_parser = parse_task_id)]
        task: TaskId,

        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
    },
}

/// Arguments for the `upcoming` command
#[derive(Parser, Debug, Clone)]
pub struct UpcomingArgs {
    /// Window in days (defaults to `upcoming-days` from the config)
    #[arg(short, long, value_parser = parse_days)]
    pub days: Option<u32>,
}
