//! End-to-end runs of the daily generators against a temp todo directory.

use chrono::NaiveDate;

use taskline::error::ScheduleError;
use taskline::recur::apply_recurring;
use taskline::remind;
use taskline::todos::codec::parse_date;
use taskline::todos::store::backup_path;
use taskline::todos::{TodoStore, parse};

fn date(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn setup() -> (tempfile::TempDir, TodoStore) {
    let tmp = tempfile::tempdir().unwrap();
    let store = TodoStore::new(tmp.path());
    (tmp, store)
}

#[tokio::test]
async fn a_week_of_recurring_tasks() {
    let (_tmp, store) = setup();
    std::fs::write(
        store.recur_path(),
        "# chores\n\
         @daily Water plants +home\n\
         @weekly (A) Review weekly goals +personal\n\
         0 9 * * 1-5 Standup @office +work\n\
         @monthly Pay rent\n",
    )
    .unwrap();

    // Friday 2025-06-13 through Monday 2025-06-16
    let mut counts = Vec::new();
    for day in ["2025-06-13", "2025-06-14", "2025-06-15", "2025-06-16"] {
        counts.push(apply_recurring(&store, date(day)).await.unwrap().len());
    }
    assert_eq!(counts, vec![2, 1, 1, 3]);

    // rerunning Monday adds nothing
    assert!(apply_recurring(&store, date("2025-06-16")).await.unwrap().is_empty());

    let records = store.load().await.unwrap();
    assert_eq!(records.len(), 7);
    let monday: Vec<String> = records
        .iter()
        .filter(|r| r.label("recur") == Some("2025-06-16"))
        .map(|r| r.to_string())
        .collect();
    assert_eq!(
        monday,
        vec![
            "Water plants +home recur:2025-06-16",
            "(A) Review weekly goals +personal recur:2025-06-16",
            "Standup +work @office recur:2025-06-16",
        ]
    );
}

#[tokio::test]
async fn completing_a_generated_task_does_not_regenerate_it() {
    let (_tmp, store) = setup();
    std::fs::write(store.recur_path(), "@daily Water plants\n").unwrap();

    let day = date("2025-06-14");
    apply_recurring(&store, day).await.unwrap();
    store.complete(1, day).await.unwrap();

    assert!(apply_recurring(&store, day).await.unwrap().is_empty());
    let done = std::fs::read_to_string(store.done_path()).unwrap();
    assert_eq!(done, "x 2025-06-14 Water plants recur:2025-06-14\n");
}

#[tokio::test]
async fn unsupported_alias_stops_the_run() {
    let (_tmp, store) = setup();
    std::fs::write(store.active_path(), "Existing\n").unwrap();
    std::fs::write(store.recur_path(), "@daily Water plants\n@hourly Check mail\n").unwrap();

    let err = apply_recurring(&store, date("2025-06-14")).await.unwrap_err();
    assert!(err.to_string().contains("line 2"));
    assert!(matches!(err, ScheduleError::AtLine { line: 2, .. }));
    assert_eq!(std::fs::read_to_string(store.active_path()).unwrap(), "Existing\n");
}

#[tokio::test]
async fn reminders_mature_into_tasks() {
    let (_tmp, store) = setup();
    std::fs::write(store.active_path(), "Existing\n").unwrap();

    for line in [
        "Renew passport +admin remind:2025-12-31",
        "Book dentist @phone remind:2025-06-15",
        "(B) File taxes remind:2025-01-01",
    ] {
        remind::add_reminder(&store, parse(line)).await.unwrap();
    }

    let promoted = remind::process(&store, date("2025-06-15")).await.unwrap();
    let descriptions: Vec<&str> = promoted.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(descriptions, vec!["Book dentist", "File taxes"]);

    assert_eq!(
        std::fs::read_to_string(store.active_path()).unwrap(),
        "Existing\n2025-06-15 Book dentist @phone\n(B) 2025-06-15 File taxes\n"
    );
    assert_eq!(
        std::fs::read_to_string(store.reminders_path()).unwrap(),
        "Renew passport +admin remind:2025-12-31\n"
    );
    // previous versions kept as backups
    assert!(backup_path(&store.active_path()).exists());
    assert!(backup_path(&store.reminders_path()).exists());

    // nothing left to promote today
    assert!(remind::process(&store, date("2025-06-15")).await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_reminders_list_in_date_order() {
    let (_tmp, store) = setup();
    for line in [
        "c remind:2025-11-01",
        "a remind:2025-06-01",
        "b remind:2025-07-15",
    ] {
        remind::add_reminder(&store, parse(line)).await.unwrap();
    }

    let mut pending = remind::load_reminders(&store).await.unwrap();
    remind::sort_by_remind_date(&mut pending);
    let order: Vec<&str> = pending.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
}
