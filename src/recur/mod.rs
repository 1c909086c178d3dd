//! Recurring templates and the scheduler that instantiates them.

pub mod schedule;
pub mod scheduler;
pub mod template;

pub use schedule::Schedule;
pub use scheduler::{apply_recurring, generate, run, should_generate};
pub use template::{RecurringTemplate, load_templates, save_templates};
