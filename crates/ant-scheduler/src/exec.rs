//! Subprocess launch plumbing shared by the engine and the admin handle.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::warn;

/// Seconds between iterations of a watch job's loop.
const WATCH_DELAY_SECS: u32 = 2;

/// Path of the per-job log file inside `log_dir`.
pub fn job_log_path(log_dir: &Path, id: i64) -> PathBuf {
    log_dir.join(format!("job-{id}.log"))
}

/// Launch `command` through `sh -c` as a detached subprocess.
///
/// stdout and stderr are appended to the job's log file (created on first
/// dispatch, never rotated or truncated), so the caller never blocks on
/// subprocess I/O. The child gets its own process group, which lets job
/// deletion signal the whole tree, and it is not killed when the returned
/// [`Child`] is dropped.
pub fn spawn_job(log_dir: &Path, id: i64, command: &str) -> std::io::Result<Child> {
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(job_log_path(log_dir, id))?;
    let log_err = log.try_clone()?;

    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err));
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.spawn()
}

/// Wrap `command` in the perpetual watch loop.
pub fn watch_command(command: &str) -> String {
    format!("while true; do\n  {command}\n  sleep {WATCH_DELAY_SECS}\ndone")
}

/// Best-effort termination of the process group rooted at `pid`.
///
/// Failure is surfaced as a warning only; callers proceed regardless.
pub fn kill_process_group(pid: i64) {
    match std::process::Command::new("pkill")
        .args(["-g", &pid.to_string()])
        .status()
    {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(%pid, %status, "process group kill reported failure"),
        Err(e) => warn!(%pid, error = %e, "failed to run pkill"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_is_keyed_by_job_id() {
        let p = job_log_path(Path::new("/var/log/ant"), 7);
        assert_eq!(p, PathBuf::from("/var/log/ant/job-7.log"));
    }

    #[test]
    fn watch_loop_wraps_command_with_fixed_delay() {
        let script = watch_command("date >> /tmp/ticks");
        assert!(script.starts_with("while true; do"));
        assert!(script.contains("date >> /tmp/ticks"));
        assert!(script.contains("sleep 2"));
        assert!(script.trim_end().ends_with("done"));
    }
}
