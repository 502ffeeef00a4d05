//! JSONL (JSON Lines) support for trellis.
//!
//! Each table of a trellis workspace (tasks, dependency edges, parent edges)
//! is stored as one JSONL file. This crate provides the pieces the store
//! needs to read those files without giving up on the first bad line and to
//! rewrite them without ever leaving a half-written file behind.
//!
//! - [`JsonlReader`]: line-numbered async reader, strict or resilient
//! - [`JsonlWriter`]: buffered async writer, one value per line
//! - [`AtomicBatch`]: temp-file-then-rename writes of several files, all
//!   together or not at all
//! - [`read_jsonl_resilient`]: load a whole file, collecting [`Warning`]s

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod atomic;
pub mod error;
pub mod reader;
pub mod warning;
pub mod writer;

pub use atomic::AtomicBatch;
pub use error::{Error, Result};
pub use reader::JsonlReader;
pub use warning::{Warning, WarningCollector};
pub use writer::JsonlWriter;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::fs::File;

/// Reads every parseable record from a JSONL file.
///
/// Malformed lines are skipped and reported as warnings instead of failing
/// the whole read. Blank lines are ignored silently.
///
/// # Errors
///
/// Returns an error only if the file cannot be opened.
///
/// # Examples
///
/// ```no_run
/// use trellis_jsonl::read_jsonl_resilient;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Row { task_id: u64 }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (rows, warnings) = read_jsonl_resilient::<Row, _>("tasks.jsonl").await?;
/// for warning in &warnings {
///     eprintln!("{warning}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn read_jsonl_resilient<T, P>(path: P) -> Result<(Vec<T>, Vec<Warning>)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).await?;
    let collector = WarningCollector::new();

    let values: Vec<T> = JsonlReader::new(file)
        .stream_resilient(collector.clone())
        .collect()
        .await;

    let warnings = collector.into_warnings();
    if !warnings.is_empty() {
        tracing::debug!(
            path = %path.display(),
            records = values.len(),
            warnings = warnings.len(),
            "Resilient JSONL read finished with warnings"
        );
    }

    Ok((values, warnings))
}
