//! The poll–dispatch–reschedule loop and the per-subprocess completion
//! reconciler.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ant_core::config::SchedulerConfig;
use chrono::Local;
use tokio::process::Child;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::{
    db::JobStore,
    error::{Result, SchedulerError},
    exec, schedule,
    types::Job,
};

/// Core scheduler: polls the job table on a fixed period and launches due
/// jobs as detached shell subprocesses.
///
/// The store mutex is the single job-table lock: it is held across a whole
/// tick's dispatch batch, and every completion reconciler takes it before
/// resetting a pid. That rules out double-dispatch from overlapping ticks and
/// mark-running / mark-completed reorderings.
pub struct SchedulerEngine {
    store: Arc<Mutex<JobStore>>,
    log_dir: PathBuf,
    poll_interval: Duration,
}

impl SchedulerEngine {
    /// Create an engine over the shared store. Creating the log directory is
    /// part of startup; failure here is fatal to the daemon.
    pub fn new(store: Arc<Mutex<JobStore>>, config: &SchedulerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.log_dir)?;
        Ok(Self {
            store,
            log_dir: PathBuf::from(&config.log_dir),
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
        })
    }

    /// Main event loop. Polls until `shutdown` broadcasts `true`.
    ///
    /// Shutdown stops the ticker and lets the in-progress tick finish; it
    /// does not kill running subprocesses or their reconcilers — they are
    /// reaped by whatever starts next.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(log_dir = %self.log_dir.display(), "scheduler engine started");

        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One poll cycle: dispatch every due job, then re-arm those with a
    /// schedule. A failing due-query aborts only this tick; a failing
    /// dispatch or reschedule aborts only that job.
    fn tick(&self) -> Result<()> {
        let now = Local::now().timestamp();
        let store = self.store.lock().unwrap();

        for job in store.due(now)? {
            if let Err(e) = self.dispatch(&store, &job, now) {
                // The row keeps pid = 0, so the job stays eligible and is
                // retried on the next tick.
                error!(job_id = job.id, "dispatch failed: {e}");
                continue;
            }
            if !job.schedule.is_empty() {
                if let Err(e) = self.reschedule(&store, &job) {
                    error!(job_id = job.id, "reschedule failed: {e}");
                }
            }
        }
        Ok(())
    }

    /// Launch one job: per-job log file, detached `sh -c` subprocess, pid +
    /// last_run persisted, reconciler registered.
    fn dispatch(&self, store: &JobStore, job: &Job, now: i64) -> Result<()> {
        info!(job_id = job.id, command = %job.command, "executing job");

        let mut child = exec::spawn_job(&self.log_dir, job.id, &job.command)?;
        let pid = child.id().map(i64::from).unwrap_or(0);

        if let Err(e) = store.set_running(job.id, pid, now) {
            // The subprocess is already off the ground but untracked; kill it
            // rather than leave an orphan nothing will ever reconcile.
            if let Err(kill_err) = child.start_kill() {
                warn!(job_id = job.id, %pid, "failed to kill orphaned subprocess: {kill_err}");
            }
            return Err(e);
        }

        info!(job_id = job.id, %pid, "started job");
        self.watch_completion(job.id, child);
        Ok(())
    }

    /// Completion reconciler: one task per dispatched subprocess. Waits for
    /// exit (any status), then resets the pid under the job-table lock. It
    /// touches nothing else — no next_run/last_run, no exit-code inspection.
    fn watch_completion(&self, id: i64, mut child: Child) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let _ = child.wait().await;
            let store = store.lock().unwrap();
            if let Err(e) = store.clear_pid(id) {
                // No retry exists; the job stays marked running until
                // corrected externally.
                error!(job_id = id, "failed to reset pid after completion: {e}");
            }
        });
    }

    /// Re-parse the schedule text and persist a fresh next_run.
    ///
    /// Deliberately not gated on the parsed kind: any job with non-empty
    /// schedule text is re-armed, single-run weekday schedules included.
    fn reschedule(&self, store: &JobStore, job: &Job) -> Result<()> {
        let parsed = schedule::parse(&job.schedule)?;
        let next = schedule::next_run(&parsed, Local::now()).ok_or_else(|| {
            SchedulerError::NoNextRun {
                text: job.schedule.clone(),
            }
        })?;

        store.set_next_run(job.id, next.timestamp())?;
        info!(job_id = job.id, next_run = %next, "job rescheduled");
        Ok(())
    }
}
