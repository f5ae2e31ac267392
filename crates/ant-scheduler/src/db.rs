//! SQLite persistence for the `jobs` table.

use rusqlite::Connection;

use crate::error::{Result, SchedulerError};
use crate::types::Job;

/// Initialise the job schema in `conn`.
///
/// Creates the `jobs` table (idempotent) and an index on `next_run` so the
/// polling query stays cheap as the table grows.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- The daemon and the CLI share this file; wait out short write locks.
        PRAGMA busy_timeout = 5000;

        CREATE TABLE IF NOT EXISTS jobs (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            schedule  TEXT    NOT NULL DEFAULT '',  -- raw schedule text, '' = never rescheduled
            command   TEXT    NOT NULL,
            pid       INTEGER NOT NULL DEFAULT 0,   -- 0 = not running
            next_run  INTEGER NOT NULL DEFAULT 0,   -- Unix epoch seconds
            last_run  INTEGER NOT NULL DEFAULT 0    -- Unix epoch seconds, 0 = never
        );

        -- Polling query: SELECT … WHERE next_run <= ? AND pid = 0
        CREATE INDEX IF NOT EXISTS idx_jobs_next_run ON jobs (next_run);
        ",
    )?;
    Ok(())
}

/// Thin store over one SQLite connection.
///
/// The engine, the admin handle, and every completion reconciler share a
/// single `Arc<Mutex<JobStore>>`; that mutex is the job-table lock which
/// serializes a whole dispatch batch against pid resets.
pub struct JobStore {
    conn: Connection,
}

impl JobStore {
    /// Wrap `conn`, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn })
    }

    /// Insert a new job with `pid = 0, last_run = 0`. Returns the assigned id.
    pub fn insert(&self, schedule: &str, command: &str, next_run: i64) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO jobs (schedule, command, pid, next_run, last_run)
             VALUES (?1, ?2, 0, ?3, 0)",
            rusqlite::params![schedule, command, next_run],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Record a dispatch: the new subprocess pid and the dispatch instant.
    pub fn set_running(&self, id: i64, pid: i64, last_run: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE jobs SET pid = ?1, last_run = ?2 WHERE id = ?3",
            rusqlite::params![pid, last_run, id],
        )?;
        Ok(())
    }

    /// Persist a recomputed next run time.
    pub fn set_next_run(&self, id: i64, next_run: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE jobs SET next_run = ?1 WHERE id = ?2",
            rusqlite::params![next_run, id],
        )?;
        Ok(())
    }

    /// Reset the running marker after the subprocess exits.
    pub fn clear_pid(&self, id: i64) -> Result<()> {
        self.conn
            .execute("UPDATE jobs SET pid = 0 WHERE id = ?1", [id])?;
        Ok(())
    }

    /// All due jobs: `next_run <= now` and not currently running.
    pub fn due(&self, now: i64) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, schedule, command, pid, next_run, last_run
             FROM jobs WHERE next_run <= ?1 AND pid = 0",
        )?;
        let jobs = stmt
            .query_map([now], row_to_job)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    /// Look up a single job, `JobNotFound` if the row does not exist.
    pub fn get(&self, id: i64) -> Result<Job> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, schedule, command, pid, next_run, last_run
             FROM jobs WHERE id = ?1",
        )?;
        stmt.query_row([id], row_to_job)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => SchedulerError::JobNotFound { id },
                other => SchedulerError::Database(other),
            })
    }

    /// Delete a job row. Returns `JobNotFound` if no row was removed.
    pub fn delete(&self, id: i64) -> Result<()> {
        let n = self.conn.execute("DELETE FROM jobs WHERE id = ?1", [id])?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { id });
        }
        Ok(())
    }

    /// All jobs, ordered by id, for display.
    pub fn all(&self) -> Result<Vec<Job>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, schedule, command, pid, next_run, last_run
             FROM jobs ORDER BY id",
        )?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> std::result::Result<Job, rusqlite::Error> {
    Ok(Job {
        id: row.get(0)?,
        schedule: row.get(1)?,
        command: row.get(2)?,
        pid: row.get(3)?,
        next_run: row.get(4)?,
        last_run: row.get(5)?,
    })
}
