use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The schedule text does not match the grammar.
    #[error("Invalid schedule: {0}")]
    Parse(#[from] ParseError),

    /// The schedule produced no representable next run time
    /// (e.g. the local instant falls in a DST gap).
    #[error("Schedule yields no next run time: {text:?}")]
    NoNextRun { text: String },

    /// No job with the given ID exists in the store.
    #[error("Job not found: {id}")]
    JobNotFound { id: i64 },

    /// The subprocess (or its log file) could not be started.
    #[error("Failed to launch job: {0}")]
    Launch(#[from] std::io::Error),
}

/// Rejection of a schedule string, before any row is created.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty schedule")]
    Empty,

    #[error("invalid interval: {0:?}")]
    BadInterval(String),

    #[error("expected '<weekday> <HHMM>', got: {0:?}")]
    FieldCount(String),

    #[error("invalid weekday: {0:?}")]
    BadWeekday(String),

    #[error("invalid time of day: {0:?}")]
    BadTimeOfDay(String),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
