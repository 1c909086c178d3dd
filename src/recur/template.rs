//! Recurring templates and the `recur.txt` file.
//!
//! One template per line:
//!
//! ```text
//! @daily Check email +work @office
//! 0 9 * * 1 Team standup @office +work
//! ```
//!
//! Blank lines and `#` comments are ignored.

use std::fmt;
use std::path::Path;

use crate::error::ScheduleError;
use crate::recur::schedule::Schedule;
use crate::todos::codec;
use crate::todos::model::TaskRecord;
use crate::todos::store::{read_optional, write_with_backup};

/// A schedule plus the record shape it generates.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringTemplate {
    pub schedule: Schedule,
    pub record: TaskRecord,
}

impl RecurringTemplate {
    pub fn new(schedule: Schedule, record: TaskRecord) -> Self {
        Self { schedule, record }
    }

    /// Parse one template line. Returns `Ok(None)` for blank and comment lines.
    pub fn parse_line(line: &str) -> Result<Option<Self>, ScheduleError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (spec, task) = if line.starts_with('@') {
            line.split_once(char::is_whitespace)
                .map(|(spec, task)| (spec.to_string(), task.trim()))
                .filter(|(_, task)| !task.is_empty())
                .ok_or_else(|| ScheduleError::InvalidTemplate {
                    line: line.to_string(),
                    reason: "expected format: @daily Task description".to_string(),
                })?
        } else {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return Err(ScheduleError::InvalidTemplate {
                    line: line.to_string(),
                    reason: "expected format: minute hour day month weekday Task description"
                        .to_string(),
                });
            }
            let task_start = nth_field_offset(line, 5).unwrap_or(line.len());
            (fields[..5].join(" "), line[task_start..].trim())
        };

        let schedule = Schedule::parse(&spec)?;
        Ok(Some(Self::new(schedule, codec::parse(task))))
    }
}

impl fmt::Display for RecurringTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.schedule, self.record)
    }
}

/// Byte offset where the `n`-th (0-based) whitespace-separated field starts.
fn nth_field_offset(line: &str, n: usize) -> Option<usize> {
    let mut seen = 0;
    let mut in_field = false;
    for (idx, ch) in line.char_indices() {
        if ch.is_whitespace() {
            in_field = false;
        } else if !in_field {
            if seen == n {
                return Some(idx);
            }
            seen += 1;
            in_field = true;
        }
    }
    None
}

/// Load templates from a file. A missing file yields no templates; any bad
/// line fails the whole load with its 1-based line number.
pub async fn load_templates(path: &Path) -> Result<Vec<RecurringTemplate>, ScheduleError> {
    let Some(content) = read_optional(path).await? else {
        return Ok(Vec::new());
    };

    let mut templates = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let parsed = RecurringTemplate::parse_line(line).map_err(|e| ScheduleError::AtLine {
            line: idx + 1,
            source: Box::new(e),
        })?;
        if let Some(template) = parsed {
            templates.push(template);
        }
    }
    Ok(templates)
}

/// Write templates back, one per line, backing up the previous file.
pub async fn save_templates(
    path: &Path,
    templates: &[RecurringTemplate],
) -> Result<(), ScheduleError> {
    let mut content = String::new();
    for template in templates {
        content.push_str(&template.to_string());
        content.push('\n');
    }
    write_with_backup(path, &content).await?;
    Ok(())
}
