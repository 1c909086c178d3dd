//! Reminder promotion.
//!
//! Pending reminders live in `reminders.txt` as ordinary task lines carrying
//! a `remind:<YYYY-MM-DD>` label. Once that date is reached they are copied
//! into the store as active tasks and dropped from the pending list.

use chrono::NaiveDate;

use crate::error::ReminderError;
use crate::todos::codec::{format_date, parse_date};
use crate::todos::model::{TaskRecord, keys};
use crate::todos::store::{TodoStore, read_records, write_records};

/// The raw `remind` label of a record, if any.
pub fn remind_date(record: &TaskRecord) -> Option<&str> {
    record.label(keys::REMIND)
}

/// Whether a pending record is due on `date`. ISO dates compare correctly
/// as strings.
fn is_due(record: &TaskRecord, date_str: &str) -> bool {
    remind_date(record).is_some_and(|remind| remind <= date_str)
}

/// Records whose `remind` date is on or before `date`.
pub fn due_reminders(pending: &[TaskRecord], date: NaiveDate) -> Vec<&TaskRecord> {
    let date_str = format_date(date);
    pending.iter().filter(|r| is_due(r, &date_str)).collect()
}

/// Split pending reminders into (due, still pending), keeping order.
pub fn partition_due(
    pending: Vec<TaskRecord>,
    date: NaiveDate,
) -> (Vec<TaskRecord>, Vec<TaskRecord>) {
    let date_str = format_date(date);
    pending.into_iter().partition(|r| is_due(r, &date_str))
}

/// Turn a due reminder into an active task created on `date`.
pub fn promote(reminder: &TaskRecord, date: NaiveDate) -> TaskRecord {
    let mut record = reminder.clone();
    record.labels.remove(keys::REMIND);
    record.creation_date = Some(date);
    record
}

/// Sort reminders by `remind` date, earliest first. Stable for equal dates.
pub fn sort_by_remind_date(reminders: &mut [TaskRecord]) {
    reminders.sort_by(|a, b| remind_date(a).cmp(&remind_date(b)));
}

/// Load the pending list. A missing file yields no reminders.
pub async fn load_reminders(store: &TodoStore) -> Result<Vec<TaskRecord>, ReminderError> {
    Ok(read_records(&store.reminders_path()).await?)
}

/// Append a reminder to the pending list. The `remind` label must hold a
/// valid ISO date.
pub async fn add_reminder(store: &TodoStore, reminder: TaskRecord) -> Result<TaskRecord, ReminderError> {
    let value = remind_date(&reminder).ok_or_else(|| ReminderError::MissingRemindDate {
        description: reminder.description.clone(),
    })?;
    if parse_date(value).is_none() {
        return Err(ReminderError::InvalidRemindDate {
            description: reminder.description.clone(),
            value: value.to_string(),
        });
    }

    let mut pending = load_reminders(store).await?;
    pending.push(reminder.clone());
    write_records(&store.reminders_path(), &pending).await?;
    Ok(reminder)
}

/// Promote every reminder due on `date` into the store and rewrite the
/// pending list without them. Returns the promoted records.
///
/// The store is written before the pending list. A failure between the two
/// writes leaves the reminder in both places, and a retry promotes it again.
pub async fn process(store: &TodoStore, date: NaiveDate) -> Result<Vec<TaskRecord>, ReminderError> {
    let pending = load_reminders(store).await?;
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let (due, remaining) = partition_due(pending, date);
    if due.is_empty() {
        tracing::debug!(date = %date, "No reminders due");
        return Ok(Vec::new());
    }

    let promoted: Vec<TaskRecord> = due.iter().map(|r| promote(r, date)).collect();

    let mut records = store.load().await?;
    records.extend(promoted.iter().cloned());
    store.save(&records).await.map_err(ReminderError::WriteTodos)?;

    write_records(&store.reminders_path(), &remaining)
        .await
        .map_err(ReminderError::WriteReminders)?;

    for record in &promoted {
        tracing::info!(date = %date, description = %record.description, "Promoted reminder");
    }
    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::todos::codec::parse;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn due_reminders_inclusive_of_date() {
        let pending = vec![
            parse("first remind:2025-01-01"),
            parse("second remind:2025-06-15"),
            parse("third remind:2025-12-31"),
        ];
        let due = due_reminders(&pending, date("2025-06-15"));
        let descs: Vec<&str> = due.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descs, vec!["first", "second"]);
    }

    #[test]
    fn record_without_remind_label_never_due() {
        let pending = vec![parse("no date here")];
        assert!(due_reminders(&pending, date("2099-01-01")).is_empty());
    }

    #[test]
    fn promote_strips_remind_and_sets_creation() {
        let reminder = parse("(A) Cancel insurance @home +personal remind:2025-06-01 note:call");
        let promoted = promote(&reminder, date("2025-06-15"));

        assert!(promoted.label(keys::REMIND).is_none());
        assert_eq!(promoted.label("note"), Some("call"));
        assert_eq!(promoted.creation_date, Some(date("2025-06-15")));
        assert_eq!(promoted.priority.as_deref(), Some("A"));
        assert_eq!(promoted.description, "Cancel insurance");
        assert_eq!(promoted.contexts, vec!["home"]);
        assert_eq!(promoted.projects, vec!["personal"]);
    }

    #[test]
    fn sort_orders_by_remind_date() {
        let mut reminders = vec![
            parse("c remind:2025-11-01"),
            parse("a remind:2025-06-01"),
            parse("b remind:2025-07-15"),
        ];
        sort_by_remind_date(&mut reminders);
        let descs: Vec<&str> = reminders.iter().map(|r| r.description.as_str()).collect();
        assert_eq!(descs, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn process_moves_due_items() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TodoStore::new(tmp.path());
        std::fs::write(
            store.reminders_path(),
            "evaluate system remind:2025-07-15\ncancel insurance remind:2025-11-01 @home\n(A) important remind:2025-06-01 +work\n",
        )
        .unwrap();
        std::fs::write(store.active_path(), "existing\n").unwrap();

        let promoted = process(&store, date("2025-07-15")).await.unwrap();
        assert_eq!(promoted.len(), 2);

        let active = std::fs::read_to_string(store.active_path()).unwrap();
        assert_eq!(
            active,
            "existing\n2025-07-15 evaluate system\n(A) 2025-07-15 important +work\n"
        );
        let pending = std::fs::read_to_string(store.reminders_path()).unwrap();
        assert_eq!(pending, "cancel insurance @home remind:2025-11-01\n");
    }

    #[tokio::test]
    async fn process_nothing_due_leaves_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TodoStore::new(tmp.path());
        std::fs::write(store.reminders_path(), "later remind:2030-01-01\n").unwrap();

        let promoted = process(&store, date("2025-07-15")).await.unwrap();
        assert!(promoted.is_empty());
        assert!(!store.active_path().exists());
    }

    #[tokio::test]
    async fn process_without_reminder_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TodoStore::new(tmp.path());
        assert!(process(&store, date("2025-07-15")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_reminder_validates_date() {
        let tmp = tempfile::tempdir().unwrap();
        let store = TodoStore::new(tmp.path());

        let err = add_reminder(&store, parse("no label")).await.unwrap_err();
        assert!(matches!(err, ReminderError::MissingRemindDate { .. }));

        let err = add_reminder(&store, parse("bad remind:someday")).await.unwrap_err();
        assert!(matches!(err, ReminderError::InvalidRemindDate { .. }));

        add_reminder(&store, parse("renew passport remind:2026-01-10"))
            .await
            .unwrap();
        let pending = load_reminders(&store).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(remind_date(&pending[0]), Some("2026-01-10"));
    }
}
