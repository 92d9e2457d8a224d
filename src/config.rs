use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Index store (Solr) configuration
    pub store: StoreConfig,

    /// Commit driver configuration
    pub commit: CommitConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CATALOG_IDX_)
            .add_source(
                config::Environment::with_prefix("CATALOG_IDX")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the index store
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for select/query calls (seconds)
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Timeout for update/commit calls (seconds)
    #[serde(default = "default_update_timeout")]
    pub update_timeout_secs: u64,

    /// Max concurrent connections to the store
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query_timeout_secs: default_query_timeout(),
            update_timeout_secs: default_update_timeout(),
            max_connections: default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Maximum number of documents per bulk upsert
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Durability deadline hint passed to the store (milliseconds)
    #[serde(default = "default_commit_within")]
    pub commit_within_ms: u64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            commit_within_ms: default_commit_within(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8983".to_string()
}

fn default_query_timeout() -> u64 {
    3
}

fn default_update_timeout() -> u64 {
    60
}

fn default_max_connections() -> usize {
    8
}

fn default_batch_size() -> usize {
    250
}

fn default_commit_within() -> u64 {
    5 * 60 * 1000
}

fn default_log_level() -> String {
    "info".to_string()
}
