use serde::{Deserialize, Serialize};

use crate::domain::models::query::QueryDef;

/// Main configuration structure for knotcache
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Primary analytical source (read-only, long-lived paginated reads)
    #[serde(default = "default_source")]
    pub source: DatabaseConfig,

    /// Cache store holding result tables and bookkeeping
    #[serde(default = "default_cache")]
    pub cache: DatabaseConfig,

    /// Source-side page size for fill reads
    #[serde(default = "default_page_size")]
    pub page_size: i64,

    /// Retry policy for fill jobs
    #[serde(default)]
    pub retry: RetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Registered analytical queries
    #[serde(default)]
    pub queries: Vec<QueryDef>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: default_source(),
            cache: default_cache(),
            page_size: default_page_size(),
            retry: RetryConfig::default(),
            logging: LoggingConfig::default(),
            queries: vec![],
        }
    }
}

const fn default_page_size() -> i64 {
    2000
}

fn default_source() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite:.knotcache/source.db".to_string(),
        max_connections: default_max_connections(),
    }
}

fn default_cache() -> DatabaseConfig {
    DatabaseConfig {
        url: "sqlite:.knotcache/cache.db".to_string(),
        max_connections: default_max_connections(),
    }
}

/// One relational endpoint. The source and cache stores each get their own
/// pool; a fill never shares a connection between the two.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    pub url: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

const fn default_max_connections() -> u32 {
    5
}

/// Retry policy configuration for fill jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Fraction of the backoff added as random jitter (0.0 disables)
    #[serde(default = "default_jitter")]
    pub jitter: f64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    1_000
}

const fn default_max_backoff_ms() -> u64 {
    60_000
}

const fn default_jitter() -> f64 {
    0.2
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: default_jitter(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}
