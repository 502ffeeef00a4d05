//! Relation tree rendering for `trellis dep tree` and `trellis parent tree`.

use std::collections::{BTreeMap, HashSet};
use std::io::{self, Write};

use colored::Colorize;
use serde::Serialize;

use super::color::{colored_progress_icon, colorize_id, dimmed};
use super::{OutputConfig, OutputMode};
use crate::domain::{Progress, Task, TaskId};

/// A node in a relation tree for rendering purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    /// Task ID of this node.
    pub id: TaskId,
    /// Task title, if the task still has a row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Task progress, if the task still has a row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    /// Already expanded elsewhere in the tree; children omitted.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub repeated: bool,
    /// Counterparts of this node's outgoing edges.
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Builds the tree rooted at `root` from an adjacency map.
    ///
    /// Each task is expanded the first time it is reached depth-first;
    /// later occurrences are marked `repeated`. `max_depth` limits how many
    /// edges below the root are followed.
    pub fn build(
        root: &Task,
        adjacency: &BTreeMap<TaskId, Vec<TaskId>>,
        tasks: &BTreeMap<TaskId, Task>,
        max_depth: Option<usize>,
    ) -> Self {
        let mut expanded = HashSet::from([root.id]);
        let children = Self::children(root.id, 1, adjacency, tasks, max_depth, &mut expanded);
        Self {
            id: root.id,
            title: Some(root.title.clone()),
            progress: Some(root.progress),
            repeated: false,
            children,
        }
    }

    fn children(
        id: TaskId,
        depth: usize,
        adjacency: &BTreeMap<TaskId, Vec<TaskId>>,
        tasks: &BTreeMap<TaskId, Task>,
        max_depth: Option<usize>,
        expanded: &mut HashSet<TaskId>,
    ) -> Vec<Self> {
        if max_depth.is_some_and(|max| depth > max) {
            return Vec::new();
        }
        let Some(next) = adjacency.get(&id) else {
            return Vec::new();
        };

        next.iter()
            .map(|&child| {
                let task = tasks.get(&child);
                let repeated = !expanded.insert(child);
                let children = if repeated {
                    Vec::new()
                } else {
                    Self::children(child, depth + 1, adjacency, tasks, max_depth, expanded)
                };
                Self {
                    id: child,
                    title: task.map(|t| t.title.clone()),
                    progress: task.map(|t| t.progress),
                    repeated,
                    children,
                }
            })
            .collect()
    }
}

/// Print a relation tree with ASCII/Unicode connectors.
///
/// Renders a tree like:
/// ```text
/// ◆ #1 Ship release
/// ├── #2 ✓ Write changelog
/// │   └── #4 ○ Collect merged changes
/// └── #3 ▶ Tag the build
/// ```
pub fn print_tree(root: &TreeNode, mode: OutputMode) -> io::Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let config = OutputConfig::from_env();

    match mode {
        OutputMode::Text => write_tree_text(&mut handle, root, &config),
        OutputMode::Json => super::write_json(&mut handle, root),
    }
}

/// Render the tree with ASCII art connectors.
pub(crate) fn write_tree_text<W: Write>(
    w: &mut W,
    root: &TreeNode,
    config: &OutputConfig,
) -> io::Result<()> {
    let root_icon = if config.use_ascii { "*" } else { "◆" };
    let root_icon_str = if config.use_colors {
        root_icon.cyan().bold().to_string()
    } else {
        root_icon.to_string()
    };

    writeln!(
        w,
        "{} {} {}",
        root_icon_str,
        colorize_id(root.id, config),
        root.title.as_deref().unwrap_or_default()
    )?;

    write_children(w, &root.children, &[], config)
}

/// `prefix_segments` tracks which ancestor levels still have siblings below,
/// used to draw the vertical continuation lines.
fn write_children<W: Write>(
    w: &mut W,
    children: &[TreeNode],
    prefix_segments: &[bool],
    config: &OutputConfig,
) -> io::Result<()> {
    let (branch, corner, pipe, space) = if config.use_ascii {
        ("|-- ", "`-- ", "|   ", "    ")
    } else {
        ("├── ", "└── ", "│   ", "    ")
    };

    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;

        let mut prefix = String::new();
        for &has_more in prefix_segments {
            prefix.push_str(&dimmed(if has_more { pipe } else { space }, config));
        }
        let connector = dimmed(if is_last { corner } else { branch }, config);

        let icon = child
            .progress
            .map(|p| format!(" {}", colored_progress_icon(p, config)))
            .unwrap_or_default();
        let title = child
            .title
            .as_deref()
            .map(|t| format!(" {t}"))
            .unwrap_or_else(|| format!(" {}", dimmed("(missing)", config)));
        let repeated = if child.repeated {
            format!(" {}", dimmed("(see above)", config))
        } else {
            String::new()
        };

        writeln!(
            w,
            "{}{}{}{}{}{}",
            prefix,
            connector,
            colorize_id(child.id, config),
            icon,
            title,
            repeated
        )?;

        if !child.children.is_empty() {
            let mut next_segments = prefix_segments.to_vec();
            next_segments.push(!is_last);
            write_children(w, &child.children, &next_segments, config)?;
        }
    }

    Ok(())
}
