//! Schedule specs for recurring templates.
//!
//! A spec is either one of the named aliases `@daily`, `@weekly`,
//! `@monthly`, or a standard five-field cron expression
//! (`minute hour day-of-month month day-of-week`). Any other `@` alias is
//! rejected.
//!
//! Cron expressions follow classic semantics: when both day fields are
//! restricted, a day matching either one fires.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::ScheduleError;

/// Alias table: name → cron form with a leading seconds field.
const ALIASES: &[(&str, &str)] = &[
    ("@daily", "0 0 0 * * *"),
    ("@weekly", "0 0 0 * * MON"),
    ("@monthly", "0 0 0 1 * *"),
];

/// Standard cron day-of-week numbers (0 and 7 are both Sunday).
const WEEKDAYS: [&str; 8] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];

/// A validated schedule.
#[derive(Clone)]
pub struct Schedule {
    spec: String,
    /// Fires when any of these fires.
    crons: Vec<cron::Schedule>,
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schedule").field(&self.spec).finish()
    }
}

impl PartialEq for Schedule {
    fn eq(&self, other: &Self) -> bool {
        self.spec == other.spec
    }
}

impl Schedule {
    /// Parse an alias or a five-field cron expression.
    pub fn parse(spec: &str) -> Result<Self, ScheduleError> {
        let spec = spec.trim();
        let expressions = if spec.starts_with('@') {
            ALIASES
                .iter()
                .find(|(name, _)| *name == spec)
                .map(|(_, cron)| vec![cron.to_string()])
                .ok_or_else(|| ScheduleError::UnsupportedAlias(spec.to_string()))?
        } else {
            to_cron_crate_form(spec)?
        };

        let crons = expressions
            .iter()
            .map(|expression| {
                cron::Schedule::from_str(expression).map_err(|e| ScheduleError::InvalidCron {
                    spec: spec.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            spec: spec.to_string(),
            crons,
        })
    }

    /// The spec exactly as written in the template file.
    pub fn as_str(&self) -> &str {
        &self.spec
    }

    /// Whether the schedule triggers at any moment of `date` (UTC).
    pub fn fires_on(&self, date: NaiveDate) -> bool {
        let start_of_day = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        let before = start_of_day - chrono::Duration::seconds(1);
        self.crons.iter().any(|cron| {
            cron.after(&before)
                .next()
                .is_some_and(|next| next.date_naive() == date)
        })
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec)
    }
}

/// Convert a five-field standard expression to the seconds-first form the
/// `cron` crate expects. Day-of-week values are rewritten as name lists
/// because the crate numbers Sunday as 1.
///
/// The crate ANDs the two day fields, so when both are restricted the
/// expression is split in two: one keyed on day-of-month, one on
/// day-of-week.
fn to_cron_crate_form(spec: &str) -> Result<Vec<String>, ScheduleError> {
    let fields: Vec<&str> = spec.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields[..] else {
        return Err(ScheduleError::FieldCount {
            spec: spec.to_string(),
            found: fields.len(),
        });
    };
    let weekdays = translate_weekdays(day_of_week, spec)?;

    if is_unrestricted(day_of_month) || is_unrestricted(day_of_week) {
        return Ok(vec![format!(
            "0 {minute} {hour} {day_of_month} {month} {weekdays}"
        )]);
    }
    Ok(vec![
        format!("0 {minute} {hour} {day_of_month} {month} *"),
        format!("0 {minute} {hour} * {month} {weekdays}"),
    ])
}

fn is_unrestricted(field: &str) -> bool {
    matches!(field, "*" | "?")
}

fn invalid(spec: &str, reason: String) -> ScheduleError {
    ScheduleError::InvalidCron {
        spec: spec.to_string(),
        reason,
    }
}

/// Day-of-week number 0-7 for a numeric or three-letter name token.
fn weekday_number(token: &str, spec: &str) -> Result<usize, ScheduleError> {
    let n = match token.parse::<usize>() {
        Ok(n) => n,
        Err(_) => WEEKDAYS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(token))
            .ok_or_else(|| invalid(spec, format!("unknown day of week '{token}'")))?,
    };
    if n >= WEEKDAYS.len() {
        return Err(invalid(spec, format!("day of week {n} out of range 0-7")));
    }
    Ok(n)
}

/// Expand a day-of-week field into an explicit list of names.
///
/// Ranges and steps are expanded in standard numbering first, so `1-7/2`
/// keeps Sunday and `5-7` never wraps in the crate's numbering.
fn translate_weekdays(field: &str, spec: &str) -> Result<String, ScheduleError> {
    if is_unrestricted(field) {
        return Ok(field.to_string());
    }

    let mut days = BTreeSet::new();
    for item in field.split(',') {
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => {
                let step = step
                    .parse::<usize>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(|| invalid(spec, format!("invalid step '{step}'")))?;
                (range, Some(step))
            }
            None => (item, None),
        };
        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (weekday_number(start, spec)?, weekday_number(end, spec)?),
            None if is_unrestricted(range) => (0, 6),
            // `N/step` runs to the end of the week
            None if step.is_some() => (weekday_number(range, spec)?, 6),
            None => {
                let n = weekday_number(range, spec)?;
                (n, n)
            }
        };
        if start > end {
            return Err(invalid(spec, format!("day of week range '{range}' runs backwards")));
        }
        // 7 folds onto 0 (Sunday)
        days.extend((start..=end).step_by(step.unwrap_or(1)).map(|n| n % 7));
    }

    let names: Vec<&str> = days.into_iter().map(|n| WEEKDAYS[n]).collect();
    Ok(names.join(","))
}
