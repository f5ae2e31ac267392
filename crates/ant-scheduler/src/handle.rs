//! Shared handle for job administration (add/list/delete/watch) over the
//! same job-table lock the engine uses.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use ant_core::config::SchedulerConfig;
use chrono::Local;
use tracing::{info, warn};

use crate::{
    db::JobStore,
    error::{Result, SchedulerError},
    exec, schedule,
    types::Job,
};

pub struct SchedulerHandle {
    store: Arc<Mutex<JobStore>>,
    log_dir: PathBuf,
}

impl SchedulerHandle {
    pub fn new(store: Arc<Mutex<JobStore>>, config: &SchedulerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.log_dir)?;
        Ok(Self {
            store,
            log_dir: PathBuf::from(&config.log_dir),
        })
    }

    /// Create a scheduled job. The schedule text is parsed first; a grammar
    /// error rejects the request before any row exists.
    pub fn add_job(&self, schedule_text: &str, command: &str) -> Result<Job> {
        let parsed = schedule::parse(schedule_text)?;
        let next = schedule::next_run(&parsed, Local::now()).ok_or_else(|| {
            SchedulerError::NoNextRun {
                text: schedule_text.to_string(),
            }
        })?;

        let store = self.store.lock().unwrap();
        let id = store.insert(schedule_text.trim(), command, next.timestamp())?;
        info!(job_id = id, schedule = %schedule_text.trim(), "job added");
        store.get(id)
    }

    /// Create and immediately start a watch job: the command wrapped in a
    /// perpetual 2-second loop, stored with empty schedule text so the
    /// engine never reschedules it.
    ///
    /// The subprocess is released to run on its own — no reconciler is
    /// registered, so the pid stays set until the job is deleted.
    pub fn add_watch_job(&self, command: &str) -> Result<Job> {
        let now = Local::now().timestamp();
        let store = self.store.lock().unwrap();
        let id = store.insert("", command, now)?;

        let mut child = exec::spawn_job(&self.log_dir, id, &exec::watch_command(command))?;
        let pid = child.id().map(i64::from).unwrap_or(0);

        if let Err(e) = store.set_running(id, pid, now) {
            if let Err(kill_err) = child.start_kill() {
                warn!(job_id = id, %pid, "failed to kill orphaned watch subprocess: {kill_err}");
            }
            return Err(e);
        }

        info!(job_id = id, %pid, "started watch job");
        store.get(id)
    }

    /// Delete a job. A live subprocess gets a best-effort termination signal
    /// to its process group; the row is removed even if that fails.
    pub fn delete_job(&self, id: i64) -> Result<()> {
        let store = self.store.lock().unwrap();
        let job = store.get(id)?;

        if job.pid > 0 {
            exec::kill_process_group(job.pid);
        }

        store.delete(id)?;
        info!(job_id = id, "job removed");
        Ok(())
    }

    /// Read-only projection of all jobs, for display.
    pub fn list_jobs(&self) -> Result<Vec<Job>> {
        self.store.lock().unwrap().all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn test_handle() -> (Arc<Mutex<JobStore>>, SchedulerHandle) {
        let conn = Connection::open_in_memory().expect("open failed");
        let store = Arc::new(Mutex::new(JobStore::new(conn).expect("init failed")));
        let dir = std::env::temp_dir().join(format!(
            "ant-handle-test-{}-{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        let config = SchedulerConfig {
            log_dir: dir.to_string_lossy().into_owned(),
            poll_interval_secs: 1,
        };
        let handle =
            SchedulerHandle::new(Arc::clone(&store), &config).expect("handle init failed");
        (store, handle)
    }

    #[test]
    fn add_job_computes_initial_next_run() {
        let (_store, handle) = test_handle();
        let before = Local::now().timestamp();
        let job = handle.add_job("15m", "echo hi").unwrap();
        let after = Local::now().timestamp();

        assert_eq!(job.pid, 0);
        assert_eq!(job.last_run, 0);
        assert!(job.next_run >= before + 900);
        assert!(job.next_run <= after + 900);
    }

    #[test]
    fn malformed_schedule_creates_no_row() {
        let (_store, handle) = test_handle();
        assert!(matches!(
            handle.add_job("abcd", "echo hi"),
            Err(SchedulerError::Parse(_))
        ));
        assert!(handle.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn delete_job_removes_the_row() {
        let (_store, handle) = test_handle();
        let job = handle.add_job("e 1h", "echo hi").unwrap();
        handle.delete_job(job.id).unwrap();
        assert!(handle.list_jobs().unwrap().is_empty());
        assert!(matches!(
            handle.delete_job(job.id),
            Err(SchedulerError::JobNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn watch_job_starts_immediately_with_empty_schedule() {
        let (_store, handle) = test_handle();
        let job = handle.add_watch_job("true").unwrap();

        assert_eq!(job.schedule, "");
        assert_ne!(job.pid, 0);
        assert_ne!(job.last_run, 0);

        // Deletion signals the loop's process group and removes the row.
        handle.delete_job(job.id).unwrap();
        assert!(handle.list_jobs().unwrap().is_empty());
    }

    #[test]
    fn delete_removes_row_even_if_kill_fails() {
        let (store, handle) = test_handle();
        let id = store.lock().unwrap().insert("15m", "true", 0).unwrap();
        // A pid far above the kernel's pid range: the group signal cannot
        // succeed, but the row must go regardless.
        store
            .lock()
            .unwrap()
            .set_running(id, i64::from(i32::MAX - 1), 1)
            .unwrap();

        handle.delete_job(id).unwrap();
        assert!(handle.list_jobs().unwrap().is_empty());
    }
}
