//! Error types for taskline.

use std::path::PathBuf;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    #[error("Reminder error: {0}")]
    Reminder(#[from] ReminderError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Remote source '{0}' not found in config")]
    UnknownSource(String),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {reason}")]
    Parse { path: PathBuf, reason: String },
}

/// Record store I/O errors. A missing file on load is not an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to back up {path}: {source}")]
    Backup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No active task at position {index} (have {count})")]
    NoSuchTask { index: usize, count: usize },
}

/// Malformed recurring-template configuration. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("unsupported schedule format '{0}' (supported: @daily, @weekly, @monthly)")]
    UnsupportedAlias(String),

    #[error("invalid cron expression '{spec}': expected 5 fields, found {found}")]
    FieldCount { spec: String, found: usize },

    #[error("invalid schedule '{spec}': {reason}")]
    InvalidCron { spec: String, reason: String },

    #[error("invalid template '{line}': {reason}")]
    InvalidTemplate { line: String, reason: String },

    #[error("error parsing line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<ScheduleError>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reminder list errors.
#[derive(Debug, thiserror::Error)]
pub enum ReminderError {
    #[error("reminder '{description}' has no remind:<YYYY-MM-DD> label")]
    MissingRemindDate { description: String },

    #[error("reminder '{description}' has invalid remind date '{value}'")]
    InvalidRemindDate { description: String, value: String },

    #[error("failed to write todos: {0}")]
    WriteTodos(#[source] StoreError),

    #[error("failed to write reminders: {0}")]
    WriteReminders(#[source] StoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Remote tracker errors, raised by a `RemoteGateway` implementation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{operation} failed: {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Http {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {operation}: {reason}")]
    InvalidResponse { operation: String, reason: String },

    #[error("Not a tracked remote item: {0}")]
    Untracked(String),
}

/// Errors that abort a reconciliation cycle. The cursor is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to read sync cursor for '{source_name}': {reason}")]
    CursorRead { source_name: String, reason: String },

    #[error("failed to write sync cursor for '{source_name}': {reason}")]
    CursorWrite { source_name: String, reason: String },

    #[error("failed to fetch {group} for '{source_name}': {error}")]
    Fetch {
        source_name: String,
        group: &'static str,
        #[source]
        error: GatewayError,
    },

    #[error("failed to load todos: {0}")]
    Load(#[source] StoreError),

    #[error("failed to write todos: {0}")]
    Persist(#[source] StoreError),

    #[error("failed to sync source '{name}': {error}")]
    Source {
        name: String,
        #[source]
        error: Box<SyncError>,
    },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
