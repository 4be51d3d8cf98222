//! Configuration loading and validation.
//!
//! The hub reads a single TOML file. Every knob has a default so a minimal
//! config is just an address and a hub name.

use serde::Deserialize;
use std::net::SocketAddr;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output.
    #[default]
    Pretty,
    /// JSON lines.
    Json,
}

/// Storage journaling mode. The hub always stores in SQLite; this selects
/// how eagerly it syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// Write-ahead logging.
    #[default]
    Preferred,
    /// Classic rollback journal.
    Alternate,
    /// In-memory database; pins the worker pool to a single runner.
    Fallback,
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// `[hub]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Listen address.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Name sent in `$HubName` and shown in chat.
    #[serde(default = "default_hubname")]
    pub hubname: String,
    /// Welcome lines sent to every joiner.
    #[serde(default)]
    pub motd: Vec<String>,
    /// Only nicks with existing accounts may log in.
    #[serde(default)]
    pub privatehub: bool,
    /// Unverified users lose search/connect privileges.
    #[serde(default = "default_true")]
    pub restrictunverifiedusers: bool,
    /// Expected prefix for user descriptions; mismatches are reported to ops.
    #[serde(default)]
    pub descriptionstart: String,
    /// Nick of the administrative bot.
    #[serde(default = "default_botname")]
    pub advancedbotname: String,
    /// Bot modules instantiated at startup and on `$ReloadBots`.
    #[serde(default = "default_reloadmodules")]
    pub reloadmodules: Vec<String>,
    /// Worker pool size for blocking tasks.
    #[serde(default = "default_taskrunners")]
    pub numtaskrunners: usize,
    /// Seconds to wait for the task queue to drain on shutdown.
    #[serde(default = "default_cleanuptime")]
    pub cleanuptime: u64,
    /// Maximum rows returned by the history command.
    #[serde(default = "default_maxhistoryrows")]
    pub maxhistoryrows: i64,
    /// Divisor controlling how garbled stupidified chat becomes; lower is
    /// less readable.
    #[serde(default = "default_stupidfactor")]
    pub stupidfactor: u32,
    /// Fixed seed for the stupidify transform; unset means seeded from
    /// entropy.
    #[serde(default)]
    pub stupidseed: Option<u64>,
    /// Seconds an op's RevConnectToMe authorizes a ConnectToMe back from an
    /// unverified user.
    #[serde(default = "default_connectchecktime")]
    pub connectchecktime: i64,
    /// strftime-style format for timestamps in history output.
    #[serde(default = "default_historyftime")]
    pub historyftime: String,
}

/// `[database]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite file, or `:memory:`.
    #[serde(default = "default_dbfile")]
    pub dbfile: String,
    /// Journaling mode.
    #[serde(default)]
    pub dbtype: DbType,
}

/// `[log]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LogConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_listen() -> SocketAddr {
    "0.0.0.0:411".parse().expect("static address")
}

fn default_hubname() -> String {
    "nmdcd".to_string()
}

fn default_botname() -> String {
    "AdvancedBot".to_string()
}

fn default_reloadmodules() -> Vec<String> {
    vec!["admin".to_string(), "opchat".to_string(), "logbot".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_taskrunners() -> usize {
    5
}

fn default_cleanuptime() -> u64 {
    5
}

fn default_maxhistoryrows() -> i64 {
    100
}

fn default_stupidfactor() -> u32 {
    8
}

fn default_connectchecktime() -> i64 {
    180
}

fn default_historyftime() -> String {
    // All times are rendered in UTC so they are portable across time zones.
    "%Y-%m-%d %H:%M:%S GMT".to_string()
}

fn default_dbfile() -> String {
    "nmdcd.sqlite".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        toml::from_str("").expect("defaults are complete")
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        toml::from_str("").expect("defaults are complete")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hub: HubConfig::default(),
            database: DatabaseConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load and parse a config file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&raw)?;
        Ok(config)
    }

    /// The worker pool size after applying the storage rule: an in-memory
    /// database is not safe to share, so `fallback` pins the pool to one.
    pub fn effective_taskrunners(&self) -> usize {
        if self.database.dbtype == DbType::Fallback {
            1
        } else {
            self.hub.numtaskrunners.max(1)
        }
    }
}

/// Validate a configuration, collecting every problem.
pub fn validate(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.hub.hubname.is_empty() {
        errors.push("hub.hubname must not be empty".to_string());
    }
    if config.hub.hubname.contains(['$', '|']) {
        errors.push("hub.hubname must not contain $ or |".to_string());
    }
    if config.hub.advancedbotname.is_empty()
        || config.hub.advancedbotname.contains([' ', '$', '|'])
    {
        errors.push("hub.advancedbotname must be a valid nick".to_string());
    }
    if config.hub.stupidfactor == 0 {
        errors.push("hub.stupidfactor must be at least 1".to_string());
    }
    if config.hub.connectchecktime <= 0 {
        errors.push("hub.connectchecktime must be positive".to_string());
    }
    if config.hub.maxhistoryrows <= 0 {
        errors.push("hub.maxhistoryrows must be positive".to_string());
    }
    for module in &config.hub.reloadmodules {
        if !crate::bots::is_known_module(module) {
            errors.push(format!("hub.reloadmodules: unknown bot module {module:?}"));
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.hub.numtaskrunners, 5);
        assert_eq!(config.hub.stupidfactor, 8);
        assert_eq!(config.hub.connectchecktime, 180);
        assert!(config.hub.restrictunverifiedusers);
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn parses_minimal_config() {
        let config: Config = toml::from_str(
            r#"
            [hub]
            listen = "127.0.0.1:4111"
            hubname = "Test Hub"

            [database]
            dbfile = ":memory:"
            dbtype = "fallback"
            "#,
        )
        .unwrap();
        assert_eq!(config.hub.hubname, "Test Hub");
        assert_eq!(config.database.dbtype, DbType::Fallback);
        // In-memory storage pins the pool to a single runner.
        assert_eq!(config.effective_taskrunners(), 1);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        config.hub.stupidfactor = 0;
        config.hub.hubname = "a|b".to_string();
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
