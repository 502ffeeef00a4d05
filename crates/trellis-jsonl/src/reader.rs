//! JSONL reading operations.
//!
//! This module provides async functionality for reading JSONL files line-by-line
//! with efficient buffering and line number tracking for error reporting.

use crate::error::{Error, Result};
use crate::warning::{Warning, WarningCollector};
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Async reader for JSONL (JSON Lines) data.
///
/// `JsonlReader` wraps an async reader and provides buffered reading of JSONL
/// formatted data. It tracks line numbers to provide useful context in error
/// messages and warnings when parsing fails.
///
/// Blank lines (empty or whitespace only) are skipped in both the strict and
/// the resilient modes, but they still count towards the line number.
///
/// # Examples
///
/// ```no_run
/// use trellis_jsonl::JsonlReader;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::open("tasks.jsonl").await?;
/// let mut reader = JsonlReader::new(file);
/// while let Some(value) = reader.read_line::<serde_json::Value>().await? {
///     println!("{}: {value}", reader.line_number());
/// }
/// # Ok(())
/// # }
/// ```
pub struct JsonlReader<R> {
    /// Buffered reader wrapping the underlying async reader.
    reader: BufReader<R>,
    /// Current line number (1-based counting, 0 before any lines are read).
    line_number: usize,
    /// Reused line buffer.
    buffer: String,
}

impl<R: AsyncRead + Unpin> JsonlReader<R> {
    /// Creates a new `JsonlReader` wrapping the given async reader.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// Creates a new `JsonlReader` with a custom buffer capacity.
    #[must_use]
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            line_number: 0,
            buffer: String::new(),
        }
    }

    /// Returns the current line number.
    ///
    /// Returns 0 before any lines have been read. After reading, returns the
    /// 1-based line number of the last line read.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    fn increment_line(&mut self) {
        self.line_number += 1;
    }

    /// Reads the next non-blank line and deserializes it.
    ///
    /// Returns `Ok(None)` at end of input.
    ///
    /// # Errors
    ///
    /// - [`Error::Io`] if reading fails
    /// - [`Error::InvalidLine`] if the line is not valid JSON for `T`
    pub async fn read_line<T: DeserializeOwned>(&mut self) -> Result<Option<T>> {
        loop {
            self.buffer.clear();
            let bytes = self.reader.read_line(&mut self.buffer).await?;
            if bytes == 0 {
                return Ok(None);
            }
            self.increment_line();

            let line = self.buffer.trim();
            if line.is_empty() {
                continue;
            }

            return serde_json::from_str(line)
                .map(Some)
                .map_err(|source| Error::InvalidLine {
                    line_number: self.line_number,
                    source,
                });
        }
    }

    /// Converts the reader into a stream that skips bad lines.
    ///
    /// Lines that fail to parse are reported to `collector` as
    /// [`Warning::MalformedJson`]; lines that are not valid UTF-8 are
    /// reported as [`Warning::SkippedLine`]. Any other I/O error ends the
    /// stream after recording a warning.
    ///
    /// The returned stream is not `Unpin`; pin it with [`std::pin::pin!`]
    /// before polling it with `next()`.
    pub fn stream_resilient<T>(self, collector: WarningCollector) -> impl Stream<Item = T>
    where
        T: DeserializeOwned,
    {
        stream::unfold((self, collector), |(mut reader, collector)| async move {
            loop {
                reader.buffer.clear();
                match reader.reader.read_line(&mut reader.buffer).await {
                    Ok(0) => return None,
                    Ok(_) => {
                        reader.increment_line();
                        let line = reader.buffer.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<T>(line) {
                            Ok(value) => return Some((value, (reader, collector))),
                            Err(e) => collector.add(Warning::MalformedJson {
                                line_number: reader.line_number,
                                error: e.to_string(),
                            }),
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::InvalidData => {
                        reader.increment_line();
                        collector.add(Warning::SkippedLine {
                            line_number: reader.line_number,
                            reason: "line is not valid UTF-8".to_string(),
                        });
                    }
                    Err(e) => {
                        collector.add(Warning::SkippedLine {
                            line_number: reader.line_number + 1,
                            reason: format!("read aborted: {e}"),
                        });
                        return None;
                    }
                }
            }
        })
    }
}
