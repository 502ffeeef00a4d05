//! Atomic write operations for JSONL files.
//!
//! Data is written to a sibling file with a `.tmp` suffix, flushed, and then
//! renamed over the target. Renames within one filesystem are atomic on
//! POSIX, so a reader sees either the old table or the new one. A crash may
//! leave the temp file behind but never a truncated table.
//!
//! An [`AtomicBatch`] extends this to several tables that must change
//! together: no target is touched until every temp file has been written and
//! every existing target has been backed up.

use crate::{JsonlWriter, Result};
use serde::Serialize;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::File;

/// A group of JSONL files replaced all together or not at all.
///
/// [`stage`](Self::stage) writes each file's temp file. [`commit`](Self::commit)
/// then copies every existing target to a `.bak` sibling, renames the temp
/// files into place, and puts the backups back if any rename fails.
///
/// Dropping a batch without calling `commit` or [`discard`](Self::discard)
/// leaves its temp files on disk.
#[derive(Debug, Default)]
pub struct AtomicBatch {
    staged: Vec<Staged>,
}

#[derive(Debug)]
struct Staged {
    path: PathBuf,
    temp_path: PathBuf,
    backup_path: Option<PathBuf>,
}

impl AtomicBatch {
    /// An empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `values` to the temp file for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails. Files staged
    /// earlier stay staged; call [`discard`](Self::discard) to drop them.
    pub async fn stage<T, I, P>(&mut self, path: P, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
        P: AsRef<Path>,
    {
        let path = path.as_ref().to_path_buf();
        let temp_path = make_temp_path(&path);
        if let Err(e) = write_to_temp_file(&temp_path, values).await {
            remove_quietly(&temp_path).await;
            return Err(e);
        }
        self.staged.push(Staged {
            path,
            temp_path,
            backup_path: None,
        });
        Ok(())
    }

    /// Removes every staged temp file without touching the targets.
    pub async fn discard(self) {
        self.clean_up().await;
    }

    /// Replaces every staged target.
    ///
    /// # Errors
    ///
    /// Returns the first backup or rename error. Targets replaced before the
    /// failure are restored from their backups, so on error the files are as
    /// they were before the call unless restoring itself fails, which is
    /// logged.
    pub async fn commit(mut self) -> Result<()> {
        if let Err(e) = self.back_up().await {
            self.clean_up().await;
            return Err(e);
        }

        for (index, staged) in self.staged.iter().enumerate() {
            if let Err(e) = tokio::fs::rename(&staged.temp_path, &staged.path).await {
                self.restore(index).await;
                self.clean_up().await;
                return Err(e.into());
            }
        }

        for staged in &self.staged {
            if let Some(backup) = &staged.backup_path {
                remove_quietly(backup).await;
            }
        }
        tracing::trace!(files = self.staged.len(), "JSONL batch replaced");
        Ok(())
    }

    async fn back_up(&mut self) -> Result<()> {
        for staged in &mut self.staged {
            match tokio::fs::symlink_metadata(&staged.path).await {
                Ok(_) => {
                    let backup = make_backup_path(&staged.path);
                    staged.backup_path = Some(backup.clone());
                    tokio::fs::copy(&staged.path, &backup).await?;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Undoes the renames of every target before `failed`.
    async fn restore(&self, failed: usize) {
        for staged in self.staged[..failed].iter().rev() {
            let restored = match &staged.backup_path {
                Some(backup) => tokio::fs::rename(backup, &staged.path).await,
                None => tokio::fs::remove_file(&staged.path).await,
            };
            if let Err(e) = restored {
                tracing::error!(
                    path = %staged.path.display(),
                    error = %e,
                    "Failed to restore JSONL table"
                );
            }
        }
    }

    async fn clean_up(&self) {
        for staged in &self.staged {
            remove_quietly(&staged.temp_path).await;
            if let Some(backup) = &staged.backup_path {
                remove_quietly(backup).await;
            }
        }
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "Failed to remove leftover file");
    }
}

fn make_temp_path(path: &Path) -> PathBuf {
    with_suffix(path, "tmp")
}

fn make_backup_path(path: &Path) -> PathBuf {
    with_suffix(path, "bak")
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let extension = match path.extension() {
        Some(ext) => {
            let mut ext = ext.to_os_string();
            ext.push(".");
            ext.push(suffix);
            ext
        }
        None => OsString::from(suffix),
    };
    path.with_extension(extension)
}

async fn write_to_temp_file<T, I>(temp_path: &Path, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = File::create(temp_path).await?;
    let mut writer = JsonlWriter::new(file);
    writer.write_all(values).await?;
    writer.flush().await?;
    writer.into_inner().into_inner().sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Serialize;
    use tempfile::TempDir;

    #[derive(Serialize)]
    struct Edge {
        task_id: u64,
        other_task_id: u64,
    }

    #[rstest]
    #[case("/data/tasks.jsonl", "/data/tasks.jsonl.tmp")]
    #[case("/data/tasks", "/data/tasks.tmp")]
    #[case("backup.tar.gz", "backup.tar.gz.tmp")]
    fn temp_path_appends_tmp(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(make_temp_path(Path::new(path)), Path::new(expected));
    }

    #[tokio::test]
    async fn replaces_existing_file_and_removes_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("dependencies.jsonl");
        tokio::fs::write(&target, "stale\n").await.unwrap();

        let edges = [Edge {
            task_id: 2,
            other_task_id: 1,
        }];
        let mut batch = AtomicBatch::new();
        batch.stage(&target, &edges).await.unwrap();
        batch.commit().await.unwrap();

        let contents = tokio::fs::read_to_string(&target).await.unwrap();
        assert_eq!(contents, "{\"task_id\":2,\"other_task_id\":1}\n");
        assert!(!dir.path().join("dependencies.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn empty_input_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("parents.jsonl");

        let mut batch = AtomicBatch::new();
        batch.stage(&target, Vec::<Edge>::new()).await.unwrap();
        batch.commit().await.unwrap();

        assert_eq!(tokio::fs::metadata(&target).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn failed_stage_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("missing").join("tasks.jsonl");

        let mut batch = AtomicBatch::new();
        let result = batch
            .stage(&target, (1..=3).map(|n| edge(n, n + 1)))
            .await;

        assert!(result.is_err());
        assert!(!target.exists());
        assert!(batch.staged.is_empty());
    }

    async fn names_in(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    fn edge(task_id: u64, other_task_id: u64) -> Edge {
        Edge {
            task_id,
            other_task_id,
        }
    }

    #[rstest]
    #[case("/data/tasks.jsonl", "/data/tasks.jsonl.bak")]
    #[case("/data/tasks", "/data/tasks.bak")]
    fn backup_path_appends_bak(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(make_backup_path(Path::new(path)), Path::new(expected));
    }

    #[tokio::test]
    async fn batch_replaces_every_file() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("dependencies.jsonl");
        let second = dir.path().join("parents.jsonl");
        tokio::fs::write(&first, "stale\n").await.unwrap();

        let mut batch = AtomicBatch::new();
        batch.stage(&first, [edge(2, 1)]).await.unwrap();
        batch.stage(&second, [edge(3, 1)]).await.unwrap();
        batch.commit().await.unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&first).await.unwrap(),
            "{\"task_id\":2,\"other_task_id\":1}\n"
        );
        assert_eq!(
            tokio::fs::read_to_string(&second).await.unwrap(),
            "{\"task_id\":3,\"other_task_id\":1}\n"
        );
        assert_eq!(
            names_in(dir.path()).await,
            vec!["dependencies.jsonl", "parents.jsonl"]
        );
    }

    #[tokio::test]
    async fn unusable_second_target_leaves_first_untouched() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("tasks.jsonl");
        let second = dir.path().join("dependencies.jsonl");
        tokio::fs::write(&first, "old tasks\n").await.unwrap();
        tokio::fs::create_dir(&second).await.unwrap();
        tokio::fs::write(second.join("occupied"), "").await.unwrap();

        let mut batch = AtomicBatch::new();
        batch.stage(&first, [edge(1, 2)]).await.unwrap();
        batch.stage(&second, [edge(2, 1)]).await.unwrap();
        assert!(batch.commit().await.is_err());

        assert_eq!(tokio::fs::read_to_string(&first).await.unwrap(), "old tasks\n");
        assert!(second.is_dir());
        assert_eq!(
            names_in(dir.path()).await,
            vec!["dependencies.jsonl", "tasks.jsonl"]
        );
    }

    #[tokio::test]
    async fn failed_rename_restores_earlier_files() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("tasks.jsonl");
        let second = dir.path().join("dependencies.jsonl");
        let third = dir.path().join("parents.jsonl");
        tokio::fs::write(&first, "old tasks\n").await.unwrap();
        tokio::fs::write(&third, "old parents\n").await.unwrap();

        let mut batch = AtomicBatch::new();
        batch.stage(&first, [edge(1, 2)]).await.unwrap();
        batch.stage(&second, [edge(2, 1)]).await.unwrap();
        batch.stage(&third, [edge(3, 1)]).await.unwrap();
        // Losing the last temp file makes its rename fail after the first
        // two targets are already in place.
        tokio::fs::remove_file(&batch.staged[2].temp_path).await.unwrap();
        assert!(batch.commit().await.is_err());

        assert_eq!(tokio::fs::read_to_string(&first).await.unwrap(), "old tasks\n");
        assert_eq!(tokio::fs::read_to_string(&third).await.unwrap(), "old parents\n");
        assert_eq!(names_in(dir.path()).await, vec!["parents.jsonl", "tasks.jsonl"]);
    }

    #[tokio::test]
    async fn discard_removes_staged_temp_files() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("tasks.jsonl");

        let mut batch = AtomicBatch::new();
        batch.stage(&target, [edge(1, 2)]).await.unwrap();
        assert!(dir.path().join("tasks.jsonl.tmp").exists());
        batch.discard().await;

        assert!(names_in(dir.path()).await.is_empty());
    }
}
