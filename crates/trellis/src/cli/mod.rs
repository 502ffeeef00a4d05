//! CLI argument parsing and command dispatch.
//!
//! # Commands
//!
//! - `init`: Initialize a new trellis workspace
//! - `task`: Create, list, show, update and delete tasks
//! - `dep` / `parent`: Manage dependency and parent relations
//! - `ready`, `overdue`, `upcoming`, `focus`, `done-this-week`, `agenda`:
//!   scheduling views
//! - `stats`: Workspace counts
//!
//! # Global Flags
//!
//! - `--json`: Output in JSON format (applies to all commands)
//!
//! # Example
//!
//! ```bash
//! trellis task add "Pour foundation" --end 2025-04-01
//! trellis task add "Frame walls" --depends-on 1
//! trellis dep tree 2
//! trellis ready
//! ```

mod args;
mod execute;
mod types;
mod validators;

use anyhow::Result;
use clap::{Parser, Subcommand};

pub use args::{
    InitArgs, RelationAction, RelationArgs, TaskAction, TaskAddArgs, TaskArgs, TaskListArgs,
    TaskUpdateArgs, UpcomingArgs,
};
pub use types::{BatchError, BatchResult, LifecycleArg, ParentPolicyArg, ProgressArg};
pub use validators::{parse_date, parse_days, parse_task_id, validate_title};

use crate::app::App;
use crate::domain::EdgeKind;
use crate::output::OutputMode;

/// Trellis - task relationships and scheduling views
///
/// Track tasks, their dependencies and their parent/child structure, and
/// see what is ready, due or overdue. Data lives in `.trellis/data/` as
/// JSONL tables for easy version control.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output in JSON format for programmatic use
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize a new trellis workspace
    ///
    /// Creates `.trellis/` with a configuration file and empty tables.
    Init(InitArgs),

    /// Manage tasks
    Task(TaskArgs),

    /// Manage dependencies ("task depends on counterpart")
    ///
    /// A task is not ready to start until all of its dependencies are done.
    /// Dependencies can never form a cycle.
    Dep(RelationArgs),

    /// Manage parents ("task is a sub-task of counterpart")
    ///
    /// Parent relations can never form a cycle. Whether a task may have
    /// more than one parent is set by `parent-policy` in the config.
    Parent(RelationArgs),

    /// Show active todo tasks whose dependencies are all done
    Ready,

    /// Show unfinished tasks past their deadline
    Overdue,

    /// Show unfinished tasks due soon
    Upcoming(UpcomingArgs),

    /// Show unfinished tasks scheduled for today
    Focus,

    /// Show tasks completed since the start of the week
    DoneThisWeek,

    /// Show focus, ready and overdue lists together
    Agenda,

    /// Show workspace statistics
    Stats,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        <Self as Parser>::parse()
    }

    /// Parse CLI arguments from an iterator (for testing)
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_from<I, T>(iter: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(iter)
    }

    /// Execute the CLI command in the current directory
    ///
    /// # Errors
    ///
    /// Returns any error from opening the workspace or running the command.
    pub async fn execute(&self) -> Result<()> {
        let current_dir = std::env::current_dir()?;
        self.execute_in(&current_dir).await
    }

    /// Execute the CLI command as if started in `dir`
    ///
    /// # Errors
    ///
    /// Returns any error from opening the workspace or running the command.
    pub async fn execute_in(&self, dir: &std::path::Path) -> Result<()> {
        let output_mode = if self.json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };

        let Some(command) = &self.command else {
            println!("Trellis - task relationships and scheduling views");
            println!();
            println!("Run 'trellis --help' for usage information.");
            return Ok(());
        };

        if let Commands::Init(args) = command {
            return execute::execute_init(dir, args, output_mode).await;
        }

        let app = App::from_directory(dir).await?;
        match command {
            Commands::Init(_) => Ok(()),
            Commands::Task(args) => execute::execute_task(&app, &args.action, output_mode).await,
            Commands::Dep(args) => {
                execute::execute_relation(&app, EdgeKind::Dependency, &args.action, output_mode)
                    .await
            }
            Commands::Parent(args) => {
                execute::execute_relation(&app, EdgeKind::Parent, &args.action, output_mode).await
            }
            Commands::Ready => execute::execute_ready(&app, output_mode).await,
            Commands::Overdue => execute::execute_overdue(&app, output_mode).await,
            Commands::Upcoming(args) => execute::execute_upcoming(&app, args, output_mode).await,
            Commands::Focus => execute::execute_focus(&app, output_mode).await,
            Commands::DoneThisWeek => execute::execute_done_this_week(&app, output_mode).await,
            Commands::Agenda => execute::execute_agenda(&app, output_mode).await,
            Commands::Stats => execute::execute_stats(&app, output_mode).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;

    #[test]
    fn parses_task_add_with_relations() {
        let cli = Cli::try_parse_from([
            "trellis",
            "task",
            "add",
            "Frame walls",
            "--depends-on",
            "1,#2",
            "--parent",
            "3",
            "--end",
            "2025-04-01",
        ])
        .unwrap();

        let Some(Commands::Task(TaskArgs {
            action: TaskAction::Add(args),
        })) = cli.command
        else {
            panic!("expected task add");
        };
        assert_eq!(args.title, "Frame walls");
        assert_eq!(args.depends_on, vec![TaskId(1), TaskId(2)]);
        assert_eq!(args.parents, vec![TaskId(3)]);
        assert!(args.end.is_some());
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["trellis", "dep", "list", "4", "--json"]).unwrap();
        assert!(cli.json);
    }

    #[test]
    fn dep_add_needs_a_counterpart() {
        assert!(Cli::try_parse_from(["trellis", "dep", "add", "4"]).is_err());
    }

    #[test]
    fn parent_set_may_be_empty() {
        let cli = Cli::try_parse_from(["trellis", "parent", "set", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Parent(RelationArgs {
                action: RelationAction::Set { counterparts, .. }
            })) if counterparts.is_empty()
        ));
    }

    #[test]
    fn upcoming_days_are_range_checked() {
        assert!(Cli::try_parse_from(["trellis", "upcoming", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["trellis", "upcoming", "--days", "30"]).is_ok());
    }

    #[test]
    fn update_rejects_conflicting_date_flags() {
        assert!(Cli::try_parse_from([
            "trellis",
            "task",
            "update",
            "1",
            "--end",
            "2025-04-01",
            "--clear-end"
        ])
        .is_err());
    }
}
