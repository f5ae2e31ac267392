//! `antd` — the ant scheduler daemon.
//!
//! Opens the job database, starts the poll–dispatch loop, and runs until
//! SIGINT/SIGTERM. Shutdown lets the in-progress tick finish and leaves
//! running job subprocesses alone.

use std::sync::{Arc, Mutex};

use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "antd=info,ant_scheduler=info".into()),
        )
        .init();

    // load config: explicit path > ANT_CONFIG env > ~/.ant/ant.toml
    let config_path = std::env::var("ANT_CONFIG").ok();
    let config = ant_core::AntConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ant_core::AntConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    // One store behind one lock — shared by the poll loop and every
    // completion reconciler.
    let store = Arc::new(Mutex::new(ant_scheduler::JobStore::new(conn)?));
    let engine = ant_scheduler::SchedulerEngine::new(Arc::clone(&store), &config.scheduler)?;

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    wait_for_signal().await?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    info!("daemon stopped");
    Ok(())
}

async fn wait_for_signal() -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!(path, "failed to create parent directory: {e}");
        }
    }
}
