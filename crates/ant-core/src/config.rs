use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default poll cadence of the daemon's dispatch loop, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

/// Top-level config (ant.toml + ANT_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AntConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for AntConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite job database.
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Dispatch-loop configuration, passed explicitly into the engine at
/// construction. Job log files land in `log_dir`, one per job id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Seconds between due-job polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl AntConfig {
    /// Load config: explicit path > ANT_CONFIG env > ~/.ant/ant.toml.
    ///
    /// Any `ANT_*` environment variable overrides the file value, e.g.
    /// `ANT_DATABASE_PATH=/tmp/ant.db3`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: AntConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ANT_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ant/ant.toml", home)
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ant/ant.db3", home)
}

fn default_log_dir() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.ant/logs", home)
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_one_second_poll() {
        let cfg = AntConfig::default();
        assert_eq!(cfg.scheduler.poll_interval_secs, 1);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = AntConfig::load(Some("/nonexistent/ant.toml")).expect("load failed");
        assert!(cfg.database.path.ends_with("ant.db3"));
        assert!(cfg.scheduler.log_dir.ends_with("logs"));
    }
}
