//! Line codec for task records.
//!
//! Grammar, in emission order:
//!
//! ```text
//! [x] [completion-date] [(P)] [creation-date] description [+project]* [@context]* [key:value]*
//! ```
//!
//! Parsing never fails. Fragments that do not match a field stay in the
//! description. Positional fields are consumed first so that the tag
//! patterns never see them.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::todos::model::{DATE_FORMAT, Labels, TaskRecord};

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
static PRIORITY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(([A-Z])\)").unwrap());
static PROJECT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\+(\w+)").unwrap());
static CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(\w+)").unwrap());
// value is any non-whitespace run so URLs survive intact
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\w+):(\S+)").unwrap());

/// Completion date must start within this many characters after `x `.
const COMPLETION_DATE_WINDOW: usize = 10;
/// Priority tag must sit within this many characters of the remainder.
const PRIORITY_WINDOW: usize = 3;
/// Creation date must sit within this many characters of the remainder.
const CREATION_DATE_WINDOW: usize = 11;

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Format a date as ISO `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// First `n` characters of `s`, respecting char boundaries.
fn head(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Find a valid date fully inside the first `window` characters of `text`
/// and remove it. Returns the date and the remaining text.
fn take_date(text: &str, window: usize) -> Option<(NaiveDate, String)> {
    let m = DATE_RE.find(head(text, window))?;
    let date = parse_date(m.as_str())?;
    let mut rest = String::with_capacity(text.len());
    rest.push_str(&text[..m.start()]);
    rest.push_str(&text[m.end()..]);
    Some((date, rest))
}

/// Parse one line into a record.
pub fn parse(line: &str) -> TaskRecord {
    let mut record = TaskRecord::default();
    let mut rest = line.to_string();

    if let Some(stripped) = rest.strip_prefix("x ") {
        record.done = true;
        rest = stripped.to_string();
    }

    if record.done {
        let trimmed = rest.trim_start().to_string();
        rest = trimmed;
        if let Some((date, remaining)) = take_date(&rest, COMPLETION_DATE_WINDOW) {
            record.completion_date = Some(date);
            rest = remaining;
        }
    }

    rest = rest.trim_start().to_string();
    if let Some(caps) = PRIORITY_RE.captures(head(&rest, PRIORITY_WINDOW)) {
        record.priority = Some(caps[1].to_string());
        let consumed = caps[0].len();
        rest = rest[consumed..].to_string();
    }

    rest = rest.trim_start().to_string();
    if let Some((date, remaining)) = take_date(&rest, CREATION_DATE_WINDOW) {
        record.creation_date = Some(date);
        rest = remaining;
    }

    record.projects = PROJECT_RE
        .captures_iter(&rest)
        .map(|c| c[1].to_string())
        .collect();
    rest = PROJECT_RE.replace_all(&rest, "").into_owned();

    record.contexts = CONTEXT_RE
        .captures_iter(&rest)
        .map(|c| c[1].to_string())
        .collect();
    rest = CONTEXT_RE.replace_all(&rest, "").into_owned();

    record.labels = LABEL_RE
        .captures_iter(&rest)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect::<Labels>();
    rest = LABEL_RE.replace_all(&rest, "").into_owned();

    record.description = rest.trim().to_string();
    record
}

/// Serialize a record to one line.
pub fn serialize(record: &TaskRecord) -> String {
    let mut tokens: Vec<String> = Vec::new();

    if record.done {
        tokens.push("x".to_string());
        if let Some(date) = record.completion_date {
            tokens.push(format_date(date));
        }
    }

    if let Some(priority) = record.priority.as_deref().filter(|p| !p.is_empty()) {
        tokens.push(format!("({priority})"));
    }

    if let Some(date) = record.creation_date {
        tokens.push(format_date(date));
    }

    if !record.description.is_empty() {
        tokens.push(record.description.clone());
    }

    tokens.extend(record.projects.iter().map(|p| format!("+{p}")));
    tokens.extend(record.contexts.iter().map(|c| format!("@{c}")));
    tokens.extend(
        record
            .labels
            .ordered()
            .into_iter()
            .map(|(k, v)| format!("{k}:{v}")),
    );

    tokens.join(" ")
}

/// Parse a whole file body, skipping blank lines.
pub fn parse_lines(content: &str) -> Vec<TaskRecord> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse)
        .collect()
}

/// Serialize records one per line, newline-terminated.
pub fn serialize_lines<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a TaskRecord>,
{
    let mut out = String::new();
    for record in records {
        out.push_str(&serialize(record));
        out.push('\n');
    }
    out
}
