//! JSONL writing operations.
//!
//! This module provides async functionality for writing data in JSONL format
//! with efficient buffering.

use crate::error::Result;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Async writer for JSONL (JSON Lines) data.
///
/// Each value is serialized to a single line followed by `\n`. Output is
/// buffered; call [`flush`](Self::flush) before dropping the writer.
///
/// # Examples
///
/// ```no_run
/// use trellis_jsonl::JsonlWriter;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::create("parents.jsonl").await?;
/// let mut writer = JsonlWriter::new(file);
/// writer.write(&serde_json::json!({"task_id": 2, "other_task_id": 1})).await?;
/// writer.flush().await?;
/// # Ok(())
/// # }
/// ```
pub struct JsonlWriter<W> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a new `JsonlWriter` wrapping the given async writer.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Creates a new `JsonlWriter` with a custom buffer capacity.
    #[must_use]
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, writer),
        }
    }

    /// Returns a reference to the underlying buffered writer.
    #[must_use]
    pub fn get_ref(&self) -> &BufWriter<W> {
        &self.writer
    }

    /// Consumes the writer, returning the underlying buffered writer.
    ///
    /// This does not flush.
    #[must_use]
    pub fn into_inner(self) -> BufWriter<W> {
        self.writer
    }

    /// Serializes `value` as one line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        Ok(())
    }

    /// Serializes every value from `values`, one per line.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first serialization or write error.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.write(&value).await?;
        }
        Ok(())
    }

    /// Flushes buffered output to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    async fn written(values: &[serde_json::Value]) -> String {
        let mut writer = JsonlWriter::new(Cursor::new(Vec::new()));
        writer.write_all(values).await.unwrap();
        writer.flush().await.unwrap();
        String::from_utf8(writer.into_inner().into_inner().into_inner()).unwrap()
    }

    #[tokio::test]
    async fn each_value_lands_on_its_own_line() {
        let out = written(&[
            json!({"task_id": 1, "other_task_id": 2}),
            json!({"task_id": 3, "other_task_id": 1}),
        ])
        .await;

        assert_eq!(
            out,
            "{\"other_task_id\":2,\"task_id\":1}\n{\"other_task_id\":1,\"task_id\":3}\n"
        );
    }

    #[tokio::test]
    async fn embedded_newlines_stay_escaped() {
        let out = written(&[json!({"title": "first\nsecond"})]).await;
        assert_eq!(out.lines().count(), 1);
    }

    #[tokio::test]
    async fn nothing_is_visible_before_flush() {
        let mut writer = JsonlWriter::with_capacity(Cursor::new(Vec::new()), 1024);
        writer.write(&json!({"id": 1})).await.unwrap();
        assert!(writer.get_ref().get_ref().get_ref().is_empty());
    }
}
