//! `ant-scheduler` — Tokio-based cron-like job engine with SQLite persistence.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `jobs` table. The [`engine::SchedulerEngine`]
//! polls the table every second, launches any job whose `next_run` has arrived
//! as a detached shell subprocess, records its pid, and recomputes the next
//! scheduled time. A per-subprocess reconciler task clears the pid when the
//! process exits, under the same lock the poll loop uses.
//!
//! # Schedule grammar
//!
//! | Form           | Example     | Behaviour                                  |
//! |----------------|-------------|--------------------------------------------|
//! | Interval       | `15m`       | Fire `now + 15 minutes` after each run     |
//! | Weekday + time | `mon 0900`  | Fire Mondays at 09:00 local time           |
//! | Repeating      | `e mon 0900`| Leading `e ` marks the schedule repeating  |
//!
//! Interval units are `s`, `m`, `h`, `d` (24 h) and `w` (7 days). An empty
//! schedule string means the job is never rescheduled (watch jobs).

pub mod db;
pub mod engine;
pub mod error;
pub mod exec;
pub mod handle;
pub mod schedule;
pub mod types;

pub use db::{init_db, JobStore};
pub use engine::SchedulerEngine;
pub use error::{ParseError, Result, SchedulerError};
pub use handle::SchedulerHandle;
pub use types::{Job, Schedule, ScheduleKind, ScheduleSpec};
