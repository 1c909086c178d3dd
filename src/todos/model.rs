//! Task record data model: one record per line of a todo file.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

/// Well-known label keys.
pub mod keys {
    pub const PHASE: &str = "phase";
    pub const REPO: &str = "repo";
    pub const ISSUE: &str = "issue";
    pub const PR: &str = "pr";
    pub const URL: &str = "url";
    pub const REMIND: &str = "remind";
    pub const RECUR: &str = "recur";
    pub const SYNCED: &str = "synced";
}

/// Date format used for every date in the text encoding.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Serialization rank of a label key. Unranked keys sort alphabetically after.
fn label_rank(key: &str) -> Option<u8> {
    match key {
        keys::REPO => Some(1),
        // issue and pr are mutually exclusive
        keys::ISSUE | keys::PR => Some(2),
        keys::URL => Some(3),
        _ => None,
    }
}

/// Free-form `key:value` labels. Keys are unique.
///
/// Storage is a plain string map; the deterministic output order
/// (`repo`, `issue`/`pr`, `url`, then alphabetical) is applied by
/// [`Labels::ordered`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(BTreeMap<String, String>);

impl Labels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Insert or overwrite a label, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Labels in serialization order.
    pub fn ordered(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .0
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| match (label_rank(a), label_rank(b)) {
            (Some(ra), Some(rb)) => ra.cmp(&rb).then_with(|| a.cmp(b)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A single task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskRecord {
    pub done: bool,
    /// Only meaningful when `done` is true.
    pub completion_date: Option<NaiveDate>,
    pub creation_date: Option<NaiveDate>,
    /// Single-letter priority tag, e.g. `A`.
    pub priority: Option<String>,
    pub description: String,
    /// `+project` tags in parse order. Duplicates permitted.
    pub projects: Vec<String>,
    /// `@context` tags in parse order. Duplicates permitted.
    pub contexts: Vec<String>,
    pub labels: Labels,
}

impl TaskRecord {
    /// Create an open task with the given description.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// Builder: set priority.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Builder: add a project tag.
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.projects.push(project.into());
        self
    }

    /// Builder: add a context tag.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.contexts.push(context.into());
        self
    }

    /// Builder: set a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key, value);
        self
    }

    /// Mark done on `date`. A record already done keeps its completion date.
    pub fn complete(&mut self, date: NaiveDate) {
        if !self.done {
            self.done = true;
            self.completion_date = Some(date);
        }
    }

    /// Mark open again, clearing the completion date.
    pub fn reopen(&mut self) {
        self.done = false;
        self.completion_date = None;
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key)
    }

    pub fn has_project(&self, project: &str) -> bool {
        self.projects.iter().any(|p| p == project)
    }

    /// Whether the `synced` label is exactly `true`.
    pub fn is_synced(&self) -> bool {
        self.label(keys::SYNCED) == Some("true")
    }
}

impl fmt::Display for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::todos::codec::serialize(self))
    }
}
