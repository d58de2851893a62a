use crate::httpclient::HttpClientConfig;
use crate::pipeline::QualityWeights;
use crate::progress::BroadcasterConfig;
use crate::suppliers::AggregatorConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Outbound HTTP client configuration
    #[serde(default)]
    pub http_client: HttpClientConfig,

    /// Pipeline configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Supplier configuration
    #[serde(default)]
    pub suppliers: SuppliersConfig,

    /// AI enhancement configuration
    #[serde(default)]
    pub ai: AiConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Progress broadcaster configuration
    #[serde(default)]
    pub broadcaster: BroadcasterConfig,

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
            // Override with environment variables (prefix: BOM_ENRICHER_)
            .add_source(
                config::Environment::with_prefix("BOM_ENRICHER")
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
    pub port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Pipeline orchestration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Worker pool size
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Job queue capacity
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,

    /// Normalization step deadline (seconds)
    #[serde(default = "default_normalization_timeout")]
    pub normalization_timeout_secs: u64,

    /// Supplier aggregation step deadline (seconds)
    #[serde(default = "default_supplier_timeout")]
    pub supplier_timeout_secs: u64,

    /// AI enhancement step deadline (seconds)
    #[serde(default = "default_enhancement_timeout")]
    pub enhancement_timeout_secs: u64,

    /// Catalog storage step deadline (seconds)
    #[serde(default = "default_storage_timeout")]
    pub storage_timeout_secs: u64,

    /// Run the AI enhancement step
    #[serde(default = "default_true")]
    pub enable_ai_enhancement: bool,

    /// Quality score weights
    #[serde(default)]
    pub quality: QualityWeights,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            queue_size: default_queue_size(),
            normalization_timeout_secs: default_normalization_timeout(),
            supplier_timeout_secs: default_supplier_timeout(),
            enhancement_timeout_secs: default_enhancement_timeout(),
            storage_timeout_secs: default_storage_timeout(),
            enable_ai_enhancement: true,
            quality: QualityWeights::default(),
        }
    }
}

/// One configured supplier backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierEntry {
    /// Supplier name (used in responses and merge provenance)
    pub name: String,

    /// API base URL
    pub base_url: String,

    /// Merge priority (lower = higher priority)
    pub priority: u32,

    /// Per-call timeout (milliseconds)
    #[serde(default = "default_supplier_call_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuppliersConfig {
    /// Registered supplier backends
    #[serde(default)]
    pub adapters: Vec<SupplierEntry>,

    /// Fan-out and cache configuration
    #[serde(default)]
    pub aggregator: AggregatorConfig,
}

/// AI enhancement endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// Enable the HTTP-backed enhancer
    #[serde(default)]
    pub enabled: bool,

    /// Enhancement endpoint URL
    pub endpoint: Option<String>,

    /// Call timeout (seconds)
    #[serde(default = "default_ai_timeout")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            timeout_secs: default_ai_timeout(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend kind
    #[serde(default)]
    pub backend: StorageBackend,

    /// Database path (Sled backend)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Expose Prometheus metrics at /metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,

    /// Default tracing filter when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            prometheus_enabled: true,
            log_filter: default_log_filter(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8085
}

fn default_request_timeout() -> u64 {
    30
}

fn default_worker_count() -> usize {
    4
}

fn default_queue_size() -> usize {
    1024
}

fn default_normalization_timeout() -> u64 {
    5
}

fn default_supplier_timeout() -> u64 {
    30
}

fn default_enhancement_timeout() -> u64 {
    15
}

fn default_storage_timeout() -> u64 {
    10
}

fn default_supplier_call_timeout_ms() -> u64 {
    10_000
}

fn default_ai_timeout() -> u64 {
    15
}

fn default_true() -> bool {
    true
}

fn default_log_filter() -> String {
    "bom_enricher=info,tower_http=info".to_string()
}
