//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Done:   green   (done progress, completed actions)
//!   - Warning/Active: yellow  (in_progress, deadlines due soon)
//!   - Error/Late:     red     (overdue deadlines, deleted tasks)
//!   - Info/Reference: cyan    (task IDs, root tree node)
//!   - Muted:          dimmed  (field labels, connectors, drafts)
//!   - Emphasis:       bold    (section headers)
//!   - Default:        white   (todo progress)

use crate::domain::{Lifecycle, Progress, TaskId};
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply color to progress text.
pub(crate) fn colorize_progress(progress: Progress, config: &OutputConfig) -> String {
    let text = progress.to_string();
    if !config.use_colors {
        return text;
    }
    match progress {
        Progress::Todo => text.white().to_string(),
        Progress::InProgress => text.yellow().to_string(),
        Progress::Done => text.green().to_string(),
    }
}

/// Apply color to lifecycle text.
pub(crate) fn colorize_lifecycle(lifecycle: Lifecycle, config: &OutputConfig) -> String {
    let text = lifecycle.to_string();
    if !config.use_colors {
        return text;
    }
    match lifecycle {
        Lifecycle::Active => text,
        Lifecycle::Draft => text.dimmed().to_string(),
        Lifecycle::Deleted => text.red().to_string(),
    }
}

/// Colorize a task ID (cyan).
pub(crate) fn colorize_id(id: TaskId, config: &OutputConfig) -> String {
    let text = id.to_string();
    if !config.use_colors {
        return text;
    }
    text.cyan().to_string()
}

/// Get a colored progress icon, with ASCII fallback support.
pub(crate) fn colored_progress_icon(progress: Progress, config: &OutputConfig) -> String {
    let icon = if config.use_ascii {
        match progress {
            Progress::Todo => "o",
            Progress::InProgress => ">",
            Progress::Done => "+",
        }
    } else {
        match progress {
            Progress::Todo => "○",
            Progress::InProgress => "▶",
            Progress::Done => "✓",
        }
    };

    if !config.use_colors {
        return icon.to_string();
    }

    match progress {
        Progress::Todo => icon.white().to_string(),
        Progress::InProgress => icon.yellow().to_string(),
        Progress::Done => icon.green().to_string(),
    }
}

/// Apply dimmed style to text (for labels/field names).
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text (for section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

/// Apply cyan color to text (for arrows/connectors).
pub(crate) fn cyan(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}
