//! Per-source sync cursors.
//!
//! One JSON file maps each remote source name to the moment its last
//! successful reconciliation completed:
//!
//! ```json
//! { "work": "2025-06-15T09:30:00Z" }
//! ```

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;

use crate::error::SyncError;

pub const CURSOR_FILE: &str = "sync_cursors.json";

/// File-backed cursor map.
#[derive(Debug, Clone)]
pub struct CursorStore {
    path: PathBuf,
}

impl CursorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cursor file inside a taskline root directory.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(CURSOR_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(
        &self,
        source_name: &str,
    ) -> Result<BTreeMap<String, DateTime<Utc>>, SyncError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SyncError::CursorRead {
                    source_name: source_name.to_string(),
                    reason: format!("{}: {e}", self.path.display()),
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| SyncError::CursorRead {
            source_name: source_name.to_string(),
            reason: format!("{}: {e}", self.path.display()),
        })
    }

    /// Last successful sync for `source_name`; `None` before the first one.
    pub async fn get(&self, source_name: &str) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(self.read_all(source_name).await?.get(source_name).copied())
    }

    /// Record a successful sync. Other sources' cursors are preserved.
    pub async fn set(&self, source_name: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        let write_err = |reason: String| SyncError::CursorWrite {
            source_name: source_name.to_string(),
            reason,
        };

        let mut cursors = self.read_all(source_name).await?;
        cursors.insert(source_name.to_string(), at);
        let json = serde_json::to_string_pretty(&cursors).map_err(|e| write_err(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_err(format!("{}: {e}", parent.display())))?;
        }
        fs::write(&self.path, json)
            .await
            .map_err(|e| write_err(format!("{}: {e}", self.path.display())))
    }
}
