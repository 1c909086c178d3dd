//! Recurring task generation.
//!
//! Each template that fires on a date produces one open copy of its record
//! tagged `recur:<date>`. The pair (description, recur date) is the dedup
//! key, so running the scheduler repeatedly for the same day adds nothing
//! after the first run.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::ScheduleError;
use crate::recur::template::{RecurringTemplate, load_templates};
use crate::todos::codec::format_date;
use crate::todos::model::{TaskRecord, keys};
use crate::todos::store::TodoStore;

/// Whether `template` is due on `date`.
pub fn should_generate(template: &RecurringTemplate, date: NaiveDate) -> bool {
    template.schedule.fires_on(date)
}

/// Instantiate the template for `date`.
pub fn generate(template: &RecurringTemplate, date: NaiveDate) -> TaskRecord {
    let mut record = template.record.clone();
    record.done = false;
    record.creation_date = None;
    record.completion_date = None;
    record.labels.insert(keys::RECUR, format_date(date));
    record
}

/// Whether a record generated from `description` for `date_str` already exists.
pub fn already_generated(existing: &[TaskRecord], description: &str, date_str: &str) -> bool {
    existing
        .iter()
        .any(|r| r.description == description && r.label(keys::RECUR) == Some(date_str))
}

/// Evaluate every template against `date` and return only the new records.
/// `existing` is never modified.
pub fn run(
    templates: &[RecurringTemplate],
    date: NaiveDate,
    existing: &[TaskRecord],
) -> Vec<TaskRecord> {
    let date_str = format_date(date);
    let mut emitted: HashSet<String> = HashSet::new();
    let mut additions = Vec::new();

    for template in templates {
        if !should_generate(template, date) {
            continue;
        }
        let description = &template.record.description;
        if already_generated(existing, description, &date_str) || emitted.contains(description) {
            tracing::debug!(
                description = %description,
                date = %date_str,
                "Recurring todo already generated"
            );
            continue;
        }
        emitted.insert(description.clone());
        additions.push(generate(template, date));
    }

    additions
}

/// Load templates from the store's `recur.txt`, append the day's new records
/// and save. Returns the records added; the store is untouched when empty.
pub async fn apply_recurring(
    store: &TodoStore,
    date: NaiveDate,
) -> Result<Vec<TaskRecord>, ScheduleError> {
    let templates = load_templates(&store.recur_path()).await?;
    let mut records = store.load().await?;

    let additions = run(&templates, date, &records);
    if additions.is_empty() {
        tracing::debug!(date = %date, "No recurring todos due");
        return Ok(additions);
    }

    records.extend(additions.iter().cloned());
    store.save(&records).await?;

    tracing::info!(
        date = %date,
        count = additions.len(),
        "Generated recurring todos"
    );
    Ok(additions)
}
