//! Configuration management for the file router.
//!
//! This module provides the process-level configuration:
//! - Location of the routing rules document (bucket and key)
//! - Processor identity written into object metadata
//! - Logging and object store settings
//!
//! Sources are layered with the `config` crate: built-in defaults, an optional
//! YAML file, `FILEROUTER__*` environment variables, and finally the plain
//! `CONFIG_BUCKET` / `CONFIG_FILE_KEY` variables used by existing deployments.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::Level;

/// Environment variable naming the bucket that holds the rules document.
pub const CONFIG_BUCKET_ENV: &str = "CONFIG_BUCKET";

/// Environment variable naming the key of the rules document.
pub const CONFIG_FILE_KEY_ENV: &str = "CONFIG_FILE_KEY";

/// Default key of the rules document.
pub const DEFAULT_CONFIG_FILE_KEY: &str = "config/routing-rules.json";

/// Default processor identifier written into copied objects' metadata.
pub const DEFAULT_PROCESSOR_ID: &str = "configurable-file-mover";

/// Main router configuration.
///
/// Read once per process lifetime.
///
/// # Examples
///
/// ```no_run
/// use filerouter_core::config::RouterConfig;
///
/// let config = RouterConfig::load(None).unwrap();
/// config.validate().unwrap();
/// println!("rules at {}", config.rules_location());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Bucket holding the routing rules document
    #[serde(default)]
    pub config_bucket: String,

    /// Key of the routing rules document
    #[serde(default = "default_config_file_key")]
    pub config_file_key: String,

    /// Identifier written as `processed-by` metadata
    #[serde(default = "default_processor_id")]
    pub processor_id: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Object store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

fn default_config_file_key() -> String {
    DEFAULT_CONFIG_FILE_KEY.to_string()
}

fn default_processor_id() -> String {
    DEFAULT_PROCESSOR_ID.to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            config_bucket: String::new(),
            config_file_key: default_config_file_key(),
            processor_id: default_processor_id(),
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl RouterConfig {
    /// Loads configuration from an optional YAML file and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, env)
    }

    /// Loads configuration from an optional YAML file and an explicit set of
    /// environment variables.
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let location = path
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<environment>".to_string());

        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config_bucket = env.get(CONFIG_BUCKET_ENV).cloned();
        let config_file_key = env.get(CONFIG_FILE_KEY_ENV).cloned();

        builder = builder.add_source(
            config::Environment::with_prefix("FILEROUTER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.into_iter().collect())),
        );

        let load_failed = |e: config::ConfigError| ConfigError::LoadFailed {
            path: location.clone(),
            reason: e.to_string(),
        };

        let config = builder
            .set_override_option("config_bucket", config_bucket)
            .map_err(load_failed)?
            .set_override_option("config_file_key", config_file_key)
            .map_err(load_failed)?
            .build()
            .map_err(load_failed)?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.config_file_key.is_empty() {
            return Err(ConfigError::invalid_value(
                "config_file_key",
                "Rules document key cannot be empty",
            )
            .into());
        }

        if self.processor_id.is_empty() {
            return Err(
                ConfigError::invalid_value("processor_id", "Processor id cannot be empty").into(),
            );
        }

        self.logging.parse_level()?;

        Ok(())
    }

    /// Returns the `s3://bucket/key` location of the rules document.
    pub fn rules_location(&self) -> String {
        format!("s3://{}/{}", self.config_bucket, self.config_file_key)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Text
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingConfig {
    /// Parses the log level string to a tracing Level.
    pub fn parse_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| {
            ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                reason: format!("Invalid log level: {}", self.level),
            }
            .into()
        })
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    Text,
    /// JSON format for structured logging
    Json,
}

/// Object store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store backend type
    #[serde(default)]
    pub backend: StoreBackend,

    /// Region override for S3
    pub region: Option<String>,

    /// Custom endpoint (MinIO, LocalStack)
    pub endpoint: Option<String>,

    /// Use path-style addressing
    #[serde(default)]
    pub force_path_style: bool,
}

/// Object store backend type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-memory store (volatile, for local runs and tests)
    #[default]
    Memory,
    /// AWS S3 or an S3-compatible service
    S3,
}
