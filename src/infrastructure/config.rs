//! Configuration infrastructure
//!
//! Contains configuration loading and management for image reconciliation.
//!
//! Configuration is layered, later layers overriding earlier ones:
//! 1. Built-in defaults (see [`defaults`])
//! 2. Optional config file (JSON by default; any format `config` reads by extension)
//! 3. Environment variables, e.g. `IMAGE_RECONCILER_STORE__DATABASE_URL`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::info;

pub const APP_DIR_NAME: &str = "image-reconciler";
pub const ENV_PREFIX: &str = "IMAGE_RECONCILER";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Document store connection and document locations
    pub store: StoreConfig,

    /// Reachability probing
    pub probe: ProbeConfig,

    /// Report presentation
    pub report: ReportConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Where the mapping, product and backup documents live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// sqlx connection URL, e.g. `sqlite:/var/lib/images/store.db`
    pub database_url: String,

    /// Collection holding the central mapping document
    pub mapping_collection: String,

    /// Id of the central mapping document
    pub mapping_document: String,

    /// Collection holding one document per product
    pub products_collection: String,

    /// Collection receiving pre-mutation backups
    pub backup_collection: String,

    /// Timeout applied to every read and write
    pub operation_timeout_ms: u64,

    /// Maximum pooled connections
    pub max_connections: u32,
}

/// Reachability probe settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Number of URLs probed per run, taken from the head of the list
    pub sample_size: usize,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    pub user_agent: String,

    /// Upper bound on request rate towards the image host
    pub max_requests_per_second: u32,

    /// Follow 3xx responses instead of reporting them
    pub follow_redirects: bool,
}

/// Report presentation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Entries shown per verdict in text output
    pub sample_limit: usize,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs in the log file
    pub json_format: bool,

    /// Enable console output (stderr)
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Log directory; defaults to `logs` beside the executable
    pub directory: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Module-specific log level filters (e.g., "sqlx": "warn", "reqwest": "info")
    pub module_filters: HashMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            mapping_collection: defaults::MAPPING_COLLECTION.to_string(),
            mapping_document: defaults::MAPPING_DOCUMENT.to_string(),
            products_collection: defaults::PRODUCTS_COLLECTION.to_string(),
            backup_collection: defaults::BACKUP_COLLECTION.to_string(),
            operation_timeout_ms: defaults::STORE_OPERATION_TIMEOUT_MS,
            max_connections: defaults::STORE_MAX_CONNECTIONS,
        }
    }
}

impl StoreConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sample_size: defaults::PROBE_SAMPLE_SIZE,
            timeout_ms: defaults::PROBE_TIMEOUT_MS,
            user_agent: format!("{}/{}", APP_DIR_NAME, env!("CARGO_PKG_VERSION")),
            max_requests_per_second: defaults::PROBE_MAX_REQUESTS_PER_SECOND,
            follow_redirects: false,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            sample_limit: defaults::REPORT_SAMPLE_LIMIT,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            directory: None,
            max_files: defaults::LOG_MAX_FILES,
            module_filters: [("sqlx", "warn"), ("reqwest", "info"), ("hyper", "warn")]
                .into_iter()
                .map(|(module, level)| (module.to_string(), level.to_string()))
                .collect(),
        }
    }
}

fn default_database_url() -> String {
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
        .join("store.db");
    format!("sqlite:{}", path.display())
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Manager for the default config file location
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: Self::get_config_dir()?.join("config.json"),
        })
    }

    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Load defaults, then the config file if present, then the environment.
    pub fn load_config(&self) -> Result<AppConfig> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .context("Failed to serialize default configuration")?;

        let loaded = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::from(self.config_path.as_path()).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {:?}", self.config_path))?;

        let config: AppConfig = loaded
            .try_deserialize()
            .context("Configuration has invalid values")?;

        if self.config_path.exists() {
            info!("Loaded configuration from: {:?}", self.config_path);
        }
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config)
            .context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    /// Default collection of the central mapping document
    pub const MAPPING_COLLECTION: &str = "config";

    /// Default id of the central mapping document
    pub const MAPPING_DOCUMENT: &str = "images";

    /// Default product collection
    pub const PRODUCTS_COLLECTION: &str = "products";

    /// Default backup collection
    pub const BACKUP_COLLECTION: &str = "image_mapping_backups";

    pub const STORE_OPERATION_TIMEOUT_MS: u64 = 10_000;

    pub const STORE_MAX_CONNECTIONS: u32 = 4;

    /// Default number of probed URLs
    pub const PROBE_SAMPLE_SIZE: usize = 20;

    /// Default per-probe timeout
    pub const PROBE_TIMEOUT_MS: u64 = 8_000;

    pub const PROBE_MAX_REQUESTS_PER_SECOND: u32 = 5;

    pub const REPORT_SAMPLE_LIMIT: usize = 10;

    // Log configuration defaults
    pub const LOG_LEVEL: &str = "info";

    pub const LOG_JSON_FORMAT: bool = false;

    pub const LOG_CONSOLE_OUTPUT: bool = true;

    pub const LOG_FILE_OUTPUT: bool = false;

    pub const LOG_MAX_FILES: u32 = 5;
}
