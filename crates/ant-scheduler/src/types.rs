use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// A persisted job row.
///
/// `pid` doubles as the running marker: a job is eligible for dispatch only
/// while `pid == 0`. `next_run`/`last_run` are Unix epoch seconds; `last_run`
/// of 0 means the job has never run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Autoincrement primary key, assigned by SQLite on insert.
    pub id: i64,
    /// Raw schedule text as supplied at creation. Empty means the job has no
    /// reschedule policy (watch jobs).
    pub schedule: String,
    /// Shell command line to execute.
    pub command: String,
    /// OS pid of the in-flight subprocess, 0 when not running.
    pub pid: i64,
    /// Instant at or after which the job becomes due.
    pub next_run: i64,
    /// Instant of the most recent dispatch, 0 = never.
    pub last_run: i64,
}

/// Whether a schedule is re-armed after running.
///
/// Note: only the next-run calculation's past-instant branch consults this;
/// the engine re-arms every job with non-empty schedule text (see
/// [`crate::engine`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleKind {
    SingleRun,
    Repeating,
}

/// The two mutually exclusive schedule forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleSpec {
    /// Fixed positive interval in seconds.
    Interval { secs: u64 },
    /// A weekday plus a 24-hour time of day, in local time.
    WeekdayTime { weekday: Weekday, hour: u8, minute: u8 },
}

/// A parsed schedule descriptor. Derived from the stored text on every
/// evaluation, never persisted in structured form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub kind: ScheduleKind,
    pub spec: ScheduleSpec,
}
