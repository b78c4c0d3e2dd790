use std::{net::SocketAddr, time::Duration};

use banlist_core::RefreshOptions;
use banlist_postgres::ClusterConfig;
use serde::{Deserialize, Serialize};

/// Error types for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] ::config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub postgres: PostgresConfig,
    #[serde(default)]
    pub cluster: ClusterSettings,
    #[serde(default)]
    pub banned_users: BannedUsersSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::validation("server.port must be > 0"));
        }
        if self.postgres.urls.iter().all(|u| u.trim().is_empty()) {
            return Err(ConfigError::validation("postgres.urls must not be empty"));
        }
        if self.postgres.pool_size == 0 {
            return Err(ConfigError::validation("postgres.pool_size must be > 0"));
        }
        if self.cluster.check_interval_ms == 0 || self.cluster.check_timeout_ms == 0 {
            return Err(ConfigError::validation("cluster check interval and timeout must be > 0"));
        }
        if self.banned_users.refresh_interval_ms == 0 {
            return Err(ConfigError::validation(
                "banned_users.refresh_interval_ms must be > 0",
            ));
        }
        if self.banned_users.statement.trim().is_empty() {
            return Err(ConfigError::validation("banned_users.statement must not be empty"));
        }
        if self.banned_users.metrics_prefix.trim().is_empty() {
            return Err(ConfigError::validation(
                "banned_users.metrics_prefix must not be empty",
            ));
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::validation(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }

    /// Settings for [`banlist_postgres::PgCluster::connect`].
    pub fn cluster_config(&self) -> ClusterConfig {
        ClusterConfig {
            urls: self
                .postgres
                .urls
                .iter()
                .filter(|u| !u.trim().is_empty())
                .cloned()
                .collect(),
            pool_size: self.postgres.pool_size,
            connect_timeout: Duration::from_millis(self.postgres.connect_timeout_ms),
            check_interval: Duration::from_millis(self.cluster.check_interval_ms),
            check_timeout: Duration::from_millis(self.cluster.check_timeout_ms),
        }
    }

    /// Options for the banned users registry.
    pub fn refresh_options(&self) -> RefreshOptions {
        RefreshOptions {
            interval: Duration::from_millis(self.banned_users.refresh_interval_ms),
            statement: self.banned_users.statement.clone(),
            query_timeout: self.banned_users.query_timeout_ms.map(Duration::from_millis),
            metrics_prefix: self.banned_users.metrics_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// PostgreSQL cluster connection settings.
///
/// Each URL is used verbatim; TLS and other driver options belong in the URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// One connection URL per cluster node
    #[serde(default)]
    pub urls: Vec<String>,

    /// Connection pool size per node
    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in milliseconds
    #[serde(default = "default_postgres_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_postgres_pool_size() -> u32 {
    4
}
fn default_postgres_connect_timeout() -> u64 {
    5000
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            pool_size: default_postgres_pool_size(),
            connect_timeout_ms: default_postgres_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    #[serde(default = "default_check_interval")]
    pub check_interval_ms: u64,
    #[serde(default = "default_check_timeout")]
    pub check_timeout_ms: u64,
}
fn default_check_interval() -> u64 {
    2000
}
fn default_check_timeout() -> u64 {
    1000
}
impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            check_interval_ms: default_check_interval(),
            check_timeout_ms: default_check_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannedUsersSettings {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_statement")]
    pub statement: String,
    /// Upper bound for one fetch; unset leaves it to the pool
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,
    #[serde(default = "default_metrics_prefix")]
    pub metrics_prefix: String,
}
fn default_refresh_interval() -> u64 {
    1000
}
fn default_statement() -> String {
    banlist_core::registry::DEFAULT_STATEMENT.into()
}
fn default_metrics_prefix() -> String {
    banlist_core::metrics::DEFAULT_PREFIX.into()
}
impl Default for BannedUsersSettings {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            statement: default_statement(),
            query_timeout_ms: None,
            metrics_prefix: default_metrics_prefix(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingSettings {
    /// Log every Nth membership lookup (0 and 1 log every lookup)
    #[serde(default = "default_lookup_log_modulo")]
    pub lookup_log_modulo: u64,
}
fn default_lookup_log_modulo() -> u64 {
    100
}
impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            lookup_log_modulo: default_lookup_log_modulo(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::{AppConfig, ConfigError};
    use ::config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file name.
    pub const DEFAULT_CONFIG_PATH: &str = "banlist.toml";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., BANLIST__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("BANLIST")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("postgres.urls")
                .try_parsing(true),
        );
        let merged: AppConfig = builder.build()?.try_deserialize()?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.postgres.urls = vec!["postgres://app@db-1:6432/banlist".into()];
        cfg
    }

    #[test]
    fn test_defaults_need_urls() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("postgres.urls"));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_refresh_options_mapping() {
        let mut cfg = valid();
        cfg.banned_users.refresh_interval_ms = 2500;
        cfg.banned_users.query_timeout_ms = Some(800);

        let options = cfg.refresh_options();
        assert_eq!(options.interval, Duration::from_millis(2500));
        assert_eq!(options.query_timeout, Some(Duration::from_millis(800)));
        assert_eq!(options.statement, "SELECT login FROM banned_users");
        assert_eq!(options.metrics_prefix, "banned_user");
    }

    #[test]
    fn test_cluster_config_skips_blank_urls() {
        let mut cfg = valid();
        cfg.postgres.urls.push("  ".into());
        let cluster = cfg.cluster_config();
        assert_eq!(cluster.urls.len(), 1);
        assert_eq!(cluster.check_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut cfg = valid();
        cfg.logging.level = "loud".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }
}
