//! File-backed record store.
//!
//! A todo directory holds two sibling files:
//! - `todo.txt`: open records
//! - `done.txt`: completed records
//!
//! Loading concatenates them (active first). Saving partitions by `done`
//! and rewrites each file, renaming the previous file to `<name>.bak`
//! first. The backup is a recovery artifact only; nothing restores it
//! automatically. Callers must serialize access to a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;

use crate::error::StoreError;
use crate::todos::codec;
use crate::todos::model::TaskRecord;

/// Well-known file names inside a todo directory.
pub mod paths {
    pub const ACTIVE: &str = "todo.txt";
    pub const DONE: &str = "done.txt";
    pub const RECUR: &str = "recur.txt";
    pub const REMINDERS: &str = "reminders.txt";
}

/// Path of the backup sibling written before a file is replaced.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

/// Read a file of task lines. A missing file yields an empty list.
pub async fn read_records(path: &Path) -> Result<Vec<TaskRecord>, StoreError> {
    match read_optional(path).await? {
        Some(content) => Ok(codec::parse_lines(&content)),
        None => Ok(Vec::new()),
    }
}

/// Read a file to a string, mapping "not found" to `None`.
pub async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Replace a file's content, backing up any existing file to `.bak`.
pub async fn write_with_backup(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let exists = fs::try_exists(path)
        .await
        .map_err(|source| StoreError::Backup {
            path: path.to_path_buf(),
            source,
        })?;
    if exists {
        fs::rename(path, backup_path(path))
            .await
            .map_err(|source| StoreError::Backup {
                path: path.to_path_buf(),
                source,
            })?;
    }

    fs::write(path, content)
        .await
        .map_err(|source| StoreError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Write task lines to a file, backing up the previous version.
pub async fn write_records(path: &Path, records: &[TaskRecord]) -> Result<(), StoreError> {
    write_with_backup(path, &codec::serialize_lines(records)).await
}

/// The persisted active/completed collection rooted at a directory.
#[derive(Debug, Clone)]
pub struct TodoStore {
    dir: PathBuf,
}

impl TodoStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(paths::ACTIVE)
    }

    pub fn done_path(&self) -> PathBuf {
        self.dir.join(paths::DONE)
    }

    pub fn recur_path(&self) -> PathBuf {
        self.dir.join(paths::RECUR)
    }

    pub fn reminders_path(&self) -> PathBuf {
        self.dir.join(paths::REMINDERS)
    }

    /// Load every record: active file first, then completed.
    pub async fn load(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut records = read_records(&self.active_path()).await?;
        records.extend(read_records(&self.done_path()).await?);
        Ok(records)
    }

    /// Partition by completion state and rewrite both files.
    pub async fn save(&self, records: &[TaskRecord]) -> Result<(), StoreError> {
        let (done, active): (Vec<TaskRecord>, Vec<TaskRecord>) =
            records.iter().cloned().partition(|r| r.done);

        write_records(&self.active_path(), &active).await?;
        write_records(&self.done_path(), &done).await?;

        tracing::debug!(
            dir = %self.dir.display(),
            active = active.len(),
            done = done.len(),
            "Saved todo store"
        );
        Ok(())
    }

    /// Append a record, stamping `today` as creation date when absent.
    pub async fn add(&self, mut record: TaskRecord, today: NaiveDate) -> Result<TaskRecord, StoreError> {
        if record.creation_date.is_none() {
            record.creation_date = Some(today);
        }
        let mut records = self.load().await?;
        records.push(record.clone());
        self.save(&records).await?;
        Ok(record)
    }

    /// Mark the `index`-th (1-based) open record done on `today`.
    pub async fn complete(&self, index: usize, today: NaiveDate) -> Result<TaskRecord, StoreError> {
        let mut records = self.load().await?;
        let open: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.done)
            .map(|(i, _)| i)
            .collect();

        let position = index
            .checked_sub(1)
            .and_then(|i| open.get(i).copied())
            .ok_or(StoreError::NoSuchTask {
                index,
                count: open.len(),
            })?;

        records[position].complete(today);
        let completed = records[position].clone();
        self.save(&records).await?;
        Ok(completed)
    }
}
