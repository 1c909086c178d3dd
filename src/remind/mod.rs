//! Reminder promoter: matures dated placeholder records into active tasks.

pub mod promoter;

pub use promoter::{
    add_reminder, due_reminders, load_reminders, partition_due, process, promote,
    sort_by_remind_date,
};
