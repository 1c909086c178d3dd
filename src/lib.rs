//! Taskline: a plain-text task list with recurring tasks, reminders and
//! GitHub sync.

pub mod config;
pub mod error;
pub mod github;
pub mod recur;
pub mod remind;
pub mod sync;
pub mod todos;
