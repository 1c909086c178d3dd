//! Which remote item, if any, a local record tracks.
//!
//! Tracking lives in labels: `repo:<owner/name>` plus either `issue:<n>` or
//! `pr:<n>`. The canonical URL built here must match the URLs the gateway
//! reports, or a tracked record is not recognized and the fact is imported
//! as a new record.

use std::fmt;

use crate::todos::model::{TaskRecord, keys};

const GITHUB_HOST: &str = "https://github.com";

/// Identity of a record on the remote tracker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackedRef {
    Issue { repo: String, number: u64 },
    PullRequest { repo: String, number: u64 },
    Untracked,
}

impl TrackedRef {
    /// Read tracking labels off a record. Missing `repo`, a non-numeric
    /// number, or neither `issue` nor `pr` all mean untracked.
    pub fn from_record(record: &TaskRecord) -> Self {
        let Some(repo) = record.label(keys::REPO).filter(|r| !r.is_empty()) else {
            return Self::Untracked;
        };
        let repo = repo.to_string();

        if let Some(number) = record.label(keys::ISSUE).and_then(|n| n.parse().ok()) {
            return Self::Issue { repo, number };
        }
        if let Some(number) = record.label(keys::PR).and_then(|n| n.parse().ok()) {
            return Self::PullRequest { repo, number };
        }
        Self::Untracked
    }

    /// Parse `https://github.com/<owner>/<name>/{issues,pull}/<n>`.
    pub fn from_url(url: &str) -> Self {
        let Some(path) = url.strip_prefix(GITHUB_HOST) else {
            return Self::Untracked;
        };
        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();
        let [owner, name, kind, number] = parts.as_slice() else {
            return Self::Untracked;
        };
        let Ok(number) = number.parse::<u64>() else {
            return Self::Untracked;
        };
        let repo = format!("{owner}/{name}");
        match *kind {
            "issues" => Self::Issue { repo, number },
            "pull" => Self::PullRequest { repo, number },
            _ => Self::Untracked,
        }
    }

    /// Canonical browser URL, or `None` when untracked.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::Issue { repo, number } => Some(format!("{GITHUB_HOST}/{repo}/issues/{number}")),
            Self::PullRequest { repo, number } => Some(format!("{GITHUB_HOST}/{repo}/pull/{number}")),
            Self::Untracked => None,
        }
    }

    pub fn repo(&self) -> Option<&str> {
        match self {
            Self::Issue { repo, .. } | Self::PullRequest { repo, .. } => Some(repo),
            Self::Untracked => None,
        }
    }

    pub fn number(&self) -> Option<u64> {
        match self {
            Self::Issue { number, .. } | Self::PullRequest { number, .. } => Some(*number),
            Self::Untracked => None,
        }
    }

    pub fn is_issue(&self) -> bool {
        matches!(self, Self::Issue { .. })
    }

    pub fn is_tracked(&self) -> bool {
        !matches!(self, Self::Untracked)
    }

    /// The `issue`/`pr` label key for this ref.
    pub fn number_key(&self) -> Option<&'static str> {
        match self {
            Self::Issue { .. } => Some(keys::ISSUE),
            Self::PullRequest { .. } => Some(keys::PR),
            Self::Untracked => None,
        }
    }
}

impl fmt::Display for TrackedRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue { repo, number } => write!(f, "{repo}#{number}"),
            Self::PullRequest { repo, number } => write!(f, "{repo}!{number}"),
            Self::Untracked => f.write_str("untracked"),
        }
    }
}

/// `owner/name` from any GitHub item URL, if present.
pub fn repo_from_url(url: &str) -> Option<String> {
    let path = url.strip_prefix(GITHUB_HOST)?;
    let mut parts = path.trim_start_matches('/').split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;
    Some(format!("{owner}/{name}"))
}
