//! Warning types for non-fatal errors during JSONL processing.
//!
//! A trellis data directory is edited by hand often enough that one bad line
//! should not make the whole workspace unreadable. [`Warning`] describes a
//! line that was skipped and [`WarningCollector`] gathers them while a
//! resilient stream is being consumed.
//!
//! ```
//! use trellis_jsonl::{Warning, WarningCollector};
//!
//! let collector = WarningCollector::new();
//! collector.add(Warning::MalformedJson {
//!     line_number: 5,
//!     error: "unexpected end of input".to_string(),
//! });
//!
//! let warnings = collector.into_warnings();
//! assert_eq!(warnings.len(), 1);
//! assert_eq!(warnings[0].kind(), "malformed_json");
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A non-fatal problem found on one line of a JSONL file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The line was not valid JSON for the expected record type.
    MalformedJson {
        /// 1-based line number.
        line_number: usize,
        /// Parser error message.
        error: String,
    },

    /// The line could not be read at all and was skipped.
    SkippedLine {
        /// 1-based line number.
        line_number: usize,
        /// Why the line was skipped.
        reason: String,
    },
}

impl Warning {
    /// Returns the 1-based line number the warning refers to.
    #[must_use]
    pub fn line_number(&self) -> usize {
        match self {
            Self::MalformedJson { line_number, .. } | Self::SkippedLine { line_number, .. } => {
                *line_number
            }
        }
    }

    /// Returns a human readable description, prefixed with the line number.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::MalformedJson { line_number, error } => {
                format!("line {line_number}: malformed JSON: {error}")
            }
            Self::SkippedLine {
                line_number,
                reason,
            } => format!("line {line_number}: skipped: {reason}"),
        }
    }

    /// Returns a stable machine readable name for the warning kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedJson { .. } => "malformed_json",
            Self::SkippedLine { .. } => "skipped_line",
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

impl std::error::Error for Warning {}

/// Thread-safe accumulator for [`Warning`]s.
///
/// Clones share the same underlying list, so one clone can be handed to a
/// stream while the caller keeps another to inspect afterwards.
#[derive(Debug, Clone, Default)]
pub struct WarningCollector {
    warnings: Arc<Mutex<Vec<Warning>>>,
}

impl WarningCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a Vec half-pushed, so a
    // poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, Vec<Warning>> {
        self.warnings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records a warning.
    pub fn add(&self, warning: Warning) {
        self.lock().push(warning);
    }

    /// Returns the number of warnings recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no warnings have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns a copy of the recorded warnings.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.lock().clone()
    }

    /// Discards all recorded warnings.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Consumes the collector and returns its warnings.
    ///
    /// If other clones are still alive the list is copied instead of moved.
    #[must_use]
    pub fn into_warnings(self) -> Vec<Warning> {
        match Arc::try_unwrap(self.warnings) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        }
    }
}
