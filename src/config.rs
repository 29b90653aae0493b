use crate::search::{AccessFields, FieldCatalog, FieldDescriptor, SearchResult, SearchSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming an override config file
pub const CONFIG_PATH_ENV: &str = "GLOBAL_SEARCH_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Search backend configuration
    pub backend: BackendConfig,

    /// Query assembly and projection settings
    #[serde(default)]
    pub search: SearchSettings,

    /// Field catalog
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/local.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration, layering `config_path` over the embedded defaults
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: GLOBAL_SEARCH_)
            .add_source(
                config::Environment::with_prefix("GLOBAL_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Elasticsearch,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Base URL of the search cluster
    #[serde(default = "default_backend_url")]
    pub url: String,

    /// Index or alias searched
    #[serde(default = "default_index")]
    pub index: String,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Per-request timeout (seconds)
    #[serde(default = "default_backend_timeout")]
    pub timeout_secs: u64,

    /// JSON array of documents loaded by the memory backend
    pub seed_path: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: default_backend_url(),
            index: default_index(),
            username: None,
            password: None,
            timeout_secs: default_backend_timeout(),
            seed_path: None,
        }
    }
}

/// Catalog fields; an empty list selects the built-in order-details catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,

    #[serde(default)]
    pub access: AccessFields,
}

impl CatalogConfig {
    pub fn into_catalog(self) -> SearchResult<FieldCatalog> {
        if self.fields.is_empty() {
            return Ok(FieldCatalog::order_details());
        }
        FieldCatalog::new(self.fields, self.access)
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "order_details_alias".to_string()
}

fn default_backend_timeout() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}
