use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable prefix, e.g. `GARAGEHUB_PORT`
pub const ENV_PREFIX: &str = "GARAGEHUB";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub observability: ObservabilityConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

/// Which record store backs the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Dynamodb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,
    #[serde(default)]
    pub create_tables: bool,
    /// DynamoDB Local or another compatible endpoint
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_public_path")]
    pub public_path: String,
    /// Prepended to public paths; empty keeps URLs root-relative
    #[serde(default)]
    pub public_base_url: String,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_otp_length")]
    pub otp_length: usize,
    #[serde(default = "default_otp_ttl_seconds")]
    pub otp_ttl_seconds: u64,
    #[serde(default = "default_otp_sender")]
    pub otp_sender: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            otp_length: default_otp_length(),
            otp_ttl_seconds: default_otp_ttl_seconds(),
            otp_sender: default_otp_sender(),
        }
    }
}

impl Config {
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let config = Config {
            server: load_section("server")?,
            database: load_section("database")?,
            storage: load_section("storage")?,
            observability: load_section("observability")?,
            auth: load_section("auth")?,
        };

        config.validate()?;

        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(message: &str) -> Result<(), ConfigError> {
            Err(ConfigError::ValidationError {
                message: message.to_string(),
            })
        }

        if self.server.port == 0 {
            return invalid("Server port cannot be 0");
        }
        if self.server.request_timeout_seconds == 0 {
            return invalid("Request timeout cannot be 0");
        }
        if self.database.table_prefix.trim().is_empty() {
            return invalid("Table prefix cannot be empty");
        }
        if self.storage.upload_dir.as_os_str().is_empty() {
            return invalid("Upload directory cannot be empty");
        }
        // Static files are nested under this prefix; the router root is taken
        if self.storage.public_path.trim().trim_matches('/').is_empty() {
            return invalid("Public path must name a prefix such as /uploads, not the root");
        }
        if self.storage.max_file_size == 0 {
            return invalid("Max file size cannot be 0");
        }
        if self.auth.otp_length == 0 {
            return invalid("OTP length cannot be 0");
        }
        Ok(())
    }
}

/// Every section reads the same flat `GARAGEHUB_*` namespace
fn load_section<T: serde::de::DeserializeOwned>(section: &str) -> Result<T, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to load {} config: {}", section, e),
        })?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", section, e),
        })
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("server")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("database")
    }

    /// Build a DynamoDB client for the configured region and endpoint
    pub async fn dynamodb_client(&self) -> DynamoDbClient {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(self.region.clone()));
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        DynamoDbClient::new(&loader.load().await)
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("storage")
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_section("observability")
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8000
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    25 * 1024 * 1024
}

pub(crate) fn default_backend() -> StorageBackend {
    StorageBackend::Memory
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_table_prefix() -> String {
    "garagehub".to_string()
}

pub(crate) fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

pub(crate) fn default_public_path() -> String {
    "/uploads".to_string()
}

pub(crate) fn default_max_file_size() -> usize {
    5 * 1024 * 1024
}

pub(crate) fn default_service_name() -> String {
    "garagehub-rs".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}

pub(crate) fn default_otp_length() -> usize {
    6
}

pub(crate) fn default_otp_ttl_seconds() -> u64 {
    600
}

pub(crate) fn default_otp_sender() -> String {
    "no-reply@garagehub.local".to_string()
}

#[cfg(test)]
mod tests;
