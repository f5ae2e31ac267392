//! `ant` — command-line front end for the ant scheduler.
//!
//! Talks directly to the job database; the daemon (`antd`) picks up new
//! rows on its next poll. Watch jobs are the exception — they start their
//! subprocess right here, at creation.

use std::sync::{Arc, Mutex};

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};

use ant_scheduler::{Job, JobStore, SchedulerHandle};

#[derive(Parser)]
#[command(name = "ant", version, about = "Minimal cron-like job scheduler")]
struct Cli {
    /// Config file path (defaults to ~/.ant/ant.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a command, e.g. `ant add "e 15m" "tar czf backup.tgz ~"`.
    Add {
        /// Schedule text: `<n><s|m|h|d|w>` or `<weekday> <HHMM>`, with a
        /// leading `e ` to repeat.
        schedule: String,
        /// Shell command line to run.
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// Run a command in a perpetual 2-second loop, starting immediately.
    Watch {
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
    /// List all jobs.
    List,
    /// Delete a job, killing its process group if it is running.
    Delete { id: i64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ant_core::AntConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ant_core::AntConfig::default()
    });

    if let Some(parent) = std::path::Path::new(&config.database.path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = rusqlite::Connection::open(&config.database.path)?;
    let store = Arc::new(Mutex::new(JobStore::new(conn)?));
    let handle = SchedulerHandle::new(store, &config.scheduler)?;

    match cli.command {
        Commands::Add { schedule, command } => {
            let job = handle.add_job(&schedule, &command.join(" "))?;
            println!(
                "Scheduled job {} to run at {}",
                job.id,
                format_instant(job.next_run)
            );
        }
        Commands::Watch { command } => {
            let job = handle.add_watch_job(&command.join(" "))?;
            println!("Started watch job {} with PID {}", job.id, job.pid);
        }
        Commands::List => {
            print_jobs(&handle.list_jobs()?);
        }
        Commands::Delete { id } => {
            handle.delete_job(id)?;
            println!("Job {id} deleted");
        }
    }
    Ok(())
}

fn print_jobs(jobs: &[Job]) {
    println!("ID | Schedule | Command | PID | Next Run | Last Run");
    println!("----------------------------------------------------");
    for job in jobs {
        println!(
            "{} | {} | {} | {} | {} | {}",
            job.id,
            job.schedule,
            job.command,
            job.pid,
            format_instant(job.next_run),
            format_instant(job.last_run),
        );
    }
}

/// Render an epoch-second column; 0 is the never-ran sentinel.
fn format_instant(ts: i64) -> String {
    if ts == 0 {
        return "Never".to_string();
    }
    Local
        .timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
