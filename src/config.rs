//! Configuration types.
//!
//! Everything lives under one root directory (`TASKLINE_DIR`, else
//! `~/.taskline`):
//!
//! ```text
//! <root>/config.toml
//! <root>/sync_cursors.json
//! <root>/todo/{todo,done,recur,reminders}.txt
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "config.toml";
pub const TODO_DIR: &str = "todo";
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TasklineConfig {
    pub github: GitHubConfig,
}

/// GitHub access and the project boards to sync.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    pub api_url: String,
    pub sources: Vec<RemoteSource>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            api_url: DEFAULT_API_URL.to_string(),
            sources: Vec::new(),
        }
    }
}

impl GitHubConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// One project board synced as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteSource {
    pub name: String,
    pub organization: String,
    pub project_number: u64,
    /// Board statuses to import, matched case-insensitively.
    #[serde(default)]
    pub status_filters: Vec<String>,
}

impl RemoteSource {
    pub fn matches_status(&self, status: &str) -> bool {
        self.status_filters
            .iter()
            .any(|filter| filter.eq_ignore_ascii_case(status))
    }
}

impl TasklineConfig {
    /// Load `<root>/config.toml`. A missing file yields the defaults.
    pub async fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        Self::parse(&content).map_err(|reason| ConfigError::Parse { path, reason })
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Look up a configured source by name.
    pub fn source(&self, name: &str) -> Result<&RemoteSource, ConfigError> {
        self.github
            .sources
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ConfigError::UnknownSource(name.to_string()))
    }
}

/// Root directory: `TASKLINE_DIR`, else `$HOME/.taskline`.
pub fn root_dir_from_env() -> Result<PathBuf, ConfigError> {
    if let Ok(dir) = std::env::var("TASKLINE_DIR") {
        if !dir.is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME").map_err(|_| ConfigError::MissingEnvVar("HOME".into()))?;
    Ok(PathBuf::from(home).join(".taskline"))
}

pub fn todo_dir(root: &Path) -> PathBuf {
    root.join(TODO_DIR)
}

/// GitHub token from `GITHUB_TOKEN`.
pub fn github_token_from_env() -> Result<SecretString, ConfigError> {
    std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|t| !t.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| ConfigError::MissingEnvVar("GITHUB_TOKEN".into()))
}
