//! Configuration module for Suimail.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, SuimailError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins (empty = any origin, no credentials).
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/suimail.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Which blob store implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// Walrus publisher/aggregator over HTTP.
    #[default]
    Walrus,
    /// In-process store, for local development.
    Memory,
}

/// Blob store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobStoreConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: BlobBackend,
    /// Base URL of the publisher (uploads).
    #[serde(default = "default_publisher_url")]
    pub publisher_url: String,
    /// Base URL of the aggregator (downloads).
    #[serde(default = "default_aggregator_url")]
    pub aggregator_url: String,
    /// Number of storage epochs requested per upload.
    #[serde(default = "default_epochs")]
    pub epochs: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_blob_timeout")]
    pub timeout_secs: u64,
}

fn default_publisher_url() -> String {
    "https://walrus.testnet.publisher.stakepool.dev.br".to_string()
}

fn default_aggregator_url() -> String {
    "https://wal-aggregator-testnet.staketab.org".to_string()
}

fn default_epochs() -> u32 {
    50
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_blob_timeout() -> u64 {
    60
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            publisher_url: default_publisher_url(),
            aggregator_url: default_aggregator_url(),
            epochs: default_epochs(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_blob_timeout(),
        }
    }
}

/// Attachment limits configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentsConfig {
    /// Maximum number of attachments per mail.
    #[serde(default = "default_max_count")]
    pub max_count: usize,
    /// Exclusive upper bound on a single attachment size.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// Inclusive upper bound on the combined attachment size.
    #[serde(default = "default_max_total_size")]
    pub max_total_size_bytes: u64,
}

fn default_max_count() -> usize {
    5
}

fn default_max_file_size() -> u64 {
    300 * 1024
}

fn default_max_total_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_count: default_max_count(),
            max_file_size_bytes: default_max_file_size(),
            max_total_size_bytes: default_max_total_size(),
        }
    }
}

/// Address allocation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressConfig {
    /// Domain suffix appended after `@`.
    #[serde(default = "default_domain")]
    pub domain: String,
    /// Maximum number of candidates tried before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_domain() -> String {
    "suimail".to_string()
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// Mail maintenance configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Interval between purges of mails deleted by both parties (0 = disabled).
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

fn default_purge_interval() -> u64 {
    3600
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            purge_interval_secs: default_purge_interval(),
        }
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign and verify access tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    86400
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_expiry_secs: default_access_token_expiry(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional path to a log file; console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob store configuration.
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
    /// Attachment limits.
    #[serde(default)]
    pub attachments: AttachmentsConfig,
    /// Address allocation.
    #[serde(default)]
    pub address: AddressConfig,
    /// Mail maintenance.
    #[serde(default)]
    pub mail: MailConfig,
    /// Authentication.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(SuimailError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| SuimailError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `SUIMAIL_JWT_SECRET`: Override the JWT secret key
    /// - `SUIMAIL_DATABASE_PATH`: Override the database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("SUIMAIL_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.auth.jwt_secret = jwt_secret;
            }
        }
        if let Ok(path) = std::env::var("SUIMAIL_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            return Err(SuimailError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via SUIMAIL_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }

        if self.blob_store.backend == BlobBackend::Walrus {
            for (name, value) in [
                ("publisher_url", &self.blob_store.publisher_url),
                ("aggregator_url", &self.blob_store.aggregator_url),
            ] {
                url::Url::parse(value)
                    .map_err(|e| SuimailError::Config(format!("invalid {name}: {e}")))?;
            }
        }

        let limits = &self.attachments;
        if limits.max_count == 0 || limits.max_file_size_bytes == 0 || limits.max_total_size_bytes == 0
        {
            return Err(SuimailError::Config(
                "attachment limits must be greater than zero".to_string(),
            ));
        }

        if self.address.max_attempts == 0 {
            return Err(SuimailError::Config(
                "address.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.address.domain.is_empty() || self.address.domain.contains('@') {
            return Err(SuimailError::Config(format!(
                "invalid address domain: {:?}",
                self.address.domain
            )));
        }

        Ok(())
    }
}
