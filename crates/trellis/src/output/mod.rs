//! Output formatting for CLI commands.
//!
//! Every printer comes in two flavors: human-readable text and pretty JSON
//! for programmatic use. The `write_*` functions take any [`Write`] so
//! they can be tested against a buffer; the `print_*` wrappers lock stdout.
//!
//! Submodules:
//! - [`color`]: Color and styling helpers (semantic colors, icons)
//! - [`tree`]: Relation tree rendering with ASCII/Unicode connectors

pub mod color;
pub mod tree;

use crate::domain::{EdgeKind, Task, TaskId};
use crate::schedule::{Agenda, Stats};
use chrono::NaiveDate;
use serde::Serialize;
use std::env;
use std::io::{self, Write};

pub use color::{error, success, warning};
pub use tree::{print_tree, TreeNode};

use color::{
    bold, colored_progress_icon, colorize_id, colorize_lifecycle, colorize_progress, cyan, dimmed,
};

// ============================================================================
// Output Configuration
// ============================================================================

const DEFAULT_TERMINAL_WIDTH: u16 = 80;
const DEFAULT_MAX_CONTENT_WIDTH: usize = 80;

/// Configuration for output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Maximum content width for text wrapping.
    pub max_width: usize,
    /// Whether to use ASCII-only icons instead of Unicode.
    pub use_ascii: bool,
    /// Whether to use colors in output.
    pub use_colors: bool,
}

impl OutputConfig {
    /// Create a new `OutputConfig` with explicit values.
    #[must_use]
    pub fn new(max_width: usize, use_ascii: bool, use_colors: bool) -> Self {
        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }

    /// Create an `OutputConfig` by reading from environment variables.
    ///
    /// Reads:
    /// - `TRELLIS_MAX_WIDTH`: Maximum content width (default: 80)
    /// - `TRELLIS_ASCII`: Set to "1" or "true" for ASCII-only icons
    /// - `NO_COLOR`: Standard env var to disable colors (any value disables colors)
    /// - `TRELLIS_COLOR`: Set to "0" or "false" to disable colors
    #[must_use]
    pub fn from_env() -> Self {
        let max_width = match env::var("TRELLIS_MAX_WIDTH") {
            Ok(s) if !s.is_empty() => s.parse().unwrap_or_else(|_| {
                tracing::warn!(
                    env_var = "TRELLIS_MAX_WIDTH",
                    value = %s,
                    default = DEFAULT_MAX_CONTENT_WIDTH,
                    "Invalid value, using default"
                );
                DEFAULT_MAX_CONTENT_WIDTH
            }),
            _ => DEFAULT_MAX_CONTENT_WIDTH,
        };

        let use_ascii = env::var("TRELLIS_ASCII")
            .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        // https://no-color.org/
        let use_colors = env::var("NO_COLOR").is_err()
            && env::var("TRELLIS_COLOR").map_or(true, |v| v != "0" && !v.eq_ignore_ascii_case("false"));

        Self {
            max_width,
            use_ascii,
            use_colors,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_CONTENT_WIDTH,
            use_ascii: false,
            use_colors: true,
        }
    }
}

/// Get the current terminal width, falling back to default if detection fails.
fn terminal_width() -> usize {
    terminal_size::terminal_size()
        .map_or(usize::from(DEFAULT_TERMINAL_WIDTH), |(w, _)| usize::from(w.0))
}

/// Wrap text to fit within a given width, preserving existing line breaks.
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    text.lines()
        .flat_map(|line| {
            if line.trim().is_empty() {
                vec![String::new()]
            } else {
                textwrap::wrap(line, max_width)
                    .into_iter()
                    .map(std::borrow::Cow::into_owned)
                    .collect()
            }
        })
        .collect()
}

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable text format
    Text,
    /// JSON format for programmatic use
    Json,
}

/// Everything `trellis task show` displays about one task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskDetails {
    /// The task itself
    #[serde(flatten)]
    pub task: Task,
    /// Tasks this one depends on
    pub dependencies: Vec<TaskId>,
    /// Tasks that depend on this one
    pub dependents: Vec<TaskId>,
    /// Parents of this task
    pub parents: Vec<TaskId>,
    /// Children of this task
    pub children: Vec<TaskId>,
}

/// Both directions of one edge kind around a task.
#[derive(Debug, Clone, Serialize)]
pub struct Relations {
    /// Edge kind
    pub kind: EdgeKind,
    /// The task
    pub task: TaskId,
    /// Counterparts of outgoing edges
    pub outgoing: Vec<TaskId>,
    /// Sources of incoming edges
    pub incoming: Vec<TaskId>,
}

// ============================================================================
// Public Dispatch Functions
// ============================================================================

fn with_stdout<F>(f: F) -> io::Result<()>
where
    F: FnOnce(&mut io::StdoutLock<'_>, &OutputConfig) -> io::Result<()>,
{
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    f(&mut handle, &OutputConfig::from_env())
}

/// Print a list of tasks under a heading.
///
/// `today` is used to highlight deadlines that have passed.
pub fn print_tasks(
    heading: &str,
    tasks: &[Task],
    today: NaiveDate,
    mode: OutputMode,
) -> io::Result<()> {
    with_stdout(|w, config| match mode {
        OutputMode::Text => write_tasks_text(w, heading, tasks, today, config),
        OutputMode::Json => write_json(w, &tasks),
    })
}

/// Print one task with its relations (for the show command).
pub fn print_task_details(details: &TaskDetails, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| match mode {
        OutputMode::Text => write_task_details_text(w, details, terminal_width(), config),
        OutputMode::Json => write_json(w, details),
    })
}

/// Print the relations of one kind around a task.
pub fn print_relations(relations: &Relations, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| match mode {
        OutputMode::Text => write_relations_text(w, relations, config),
        OutputMode::Json => write_json(w, relations),
    })
}

/// Print the agenda composite.
pub fn print_agenda(agenda: &Agenda, today: NaiveDate, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| match mode {
        OutputMode::Text => {
            write_tasks_text(w, "Today's focus", &agenda.focus, today, config)?;
            writeln!(w)?;
            write_tasks_text(w, "Ready to start", &agenda.ready, today, config)?;
            writeln!(w)?;
            write_tasks_text(w, "Overdue", &agenda.overdue, today, config)
        }
        OutputMode::Json => write_json(w, agenda),
    })
}

/// Print workspace statistics.
pub fn print_stats(stats: &Stats, mode: OutputMode) -> io::Result<()> {
    with_stdout(|w, config| match mode {
        OutputMode::Text => write_stats_text(w, stats, config),
        OutputMode::Json => write_json(w, stats),
    })
}

/// Print a JSON-formatted result for any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_json(&mut handle, value)
}

pub(crate) fn write_json<W: Write, T: Serialize + ?Sized>(w: &mut W, value: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    writeln!(w, "{json}")
}

// ============================================================================
// Text Formatting
// ============================================================================

fn format_deadline(task: &Task, today: NaiveDate, config: &OutputConfig) -> String {
    match task.end_date {
        Some(end) if end < today && !task.is_done() => {
            format!("  {}", error(&format!("due {end}"), config))
        }
        Some(end) => format!("  {}", dimmed(&format!("due {end}"), config)),
        None => String::new(),
    }
}

fn write_tasks_text<W: Write>(
    w: &mut W,
    heading: &str,
    tasks: &[Task],
    today: NaiveDate,
    config: &OutputConfig,
) -> io::Result<()> {
    if tasks.is_empty() {
        writeln!(w, "{}: none", bold(heading, config))?;
        return Ok(());
    }

    writeln!(w, "{} ({}):", bold(heading, config), tasks.len())?;
    for task in tasks {
        writeln!(
            w,
            "{} {}  {}{}",
            colored_progress_icon(task.progress, config),
            colorize_id(task.id, config),
            task.title,
            format_deadline(task, today, config)
        )?;
    }

    Ok(())
}

fn write_id_list<W: Write>(
    w: &mut W,
    title: &str,
    arrow: &str,
    ids: &[TaskId],
    config: &OutputConfig,
) -> io::Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    writeln!(w)?;
    writeln!(w, "{} ({}):", bold(title, config), ids.len())?;
    for &id in ids {
        writeln!(w, "  {} {}", cyan(arrow, config), colorize_id(id, config))?;
    }
    Ok(())
}

fn write_task_details_text<W: Write>(
    w: &mut W,
    details: &TaskDetails,
    terminal_width: usize,
    config: &OutputConfig,
) -> io::Result<()> {
    let task = &details.task;
    let content_width = terminal_width.min(config.max_width);

    writeln!(
        w,
        "{} {}:",
        colored_progress_icon(task.progress, config),
        colorize_id(task.id, config),
    )?;
    for line in wrap_text(&task.title, content_width.saturating_sub(2)) {
        writeln!(w, "  {line}")?;
    }
    writeln!(
        w,
        "{}  {}    {}  {}",
        dimmed("Progress:", config),
        colorize_progress(task.progress, config),
        dimmed("Lifecycle:", config),
        colorize_lifecycle(task.lifecycle, config)
    )?;

    if task.start_date.is_some() || task.end_date.is_some() {
        let show = |d: Option<NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
        writeln!(
            w,
            "{} {}    {} {}",
            dimmed("Start:", config),
            show(task.start_date),
            dimmed("End:", config),
            show(task.end_date)
        )?;
    }

    writeln!(
        w,
        "{} {}    {} {}",
        dimmed("Created:", config),
        task.created_at.format("%Y-%m-%d %H:%M"),
        dimmed("Updated:", config),
        task.updated_at.format("%Y-%m-%d %H:%M")
    )?;

    let (out, back) = if config.use_ascii { ("->", "<-") } else { ("→", "←") };
    write_id_list(w, "Depends on", out, &details.dependencies, config)?;
    write_id_list(w, "Required by", back, &details.dependents, config)?;
    write_id_list(w, "Parents", out, &details.parents, config)?;
    write_id_list(w, "Children", back, &details.children, config)?;

    Ok(())
}

fn write_relations_text<W: Write>(
    w: &mut W,
    relations: &Relations,
    config: &OutputConfig,
) -> io::Result<()> {
    let kind = relations.kind;
    writeln!(w, "{} {}", bold("Task", config), colorize_id(relations.task, config))?;
    if relations.outgoing.is_empty() && relations.incoming.is_empty() {
        writeln!(w, "No {kind} relations.")?;
        return Ok(());
    }

    let (out, back) = if config.use_ascii { ("->", "<-") } else { ("→", "←") };
    let outgoing = format!("{}s", capitalize(kind.counterpart_noun()));
    let incoming = match kind {
        EdgeKind::Dependency => "Dependents".to_string(),
        EdgeKind::Parent => "Children".to_string(),
    };
    write_id_list(w, &outgoing, out, &relations.outgoing, config)?;
    write_id_list(w, &incoming, back, &relations.incoming, config)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn write_stats_text<W: Write>(w: &mut W, stats: &Stats, config: &OutputConfig) -> io::Result<()> {
    writeln!(w, "{}", bold("Trellis Statistics", config))?;
    writeln!(w, "==================")?;
    writeln!(w)?;
    writeln!(w, "Active tasks: {}", stats.total_active)?;
    writeln!(
        w,
        "  {} todo, {} in progress, {} done",
        stats.progress.todo, stats.progress.in_progress, stats.progress.done
    )?;
    writeln!(
        w,
        "Drafts: {}    Deleted: {}",
        stats.lifecycle.draft, stats.lifecycle.deleted
    )?;
    writeln!(w)?;
    writeln!(
        w,
        "Due in the next {} days: {}",
        stats.upcoming_days,
        warning(&stats.upcoming.to_string(), config)
    )?;
    writeln!(w, "Overdue: {}", error(&stats.overdue.to_string(), config))?;
    writeln!(
        w,
        "Completed this week: {}",
        success(&stats.completed_this_week.to_string(), config)
    )?;
    Ok(())
}
