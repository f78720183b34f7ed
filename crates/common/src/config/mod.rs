//! Configuration management for Shopwise services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Catalog/live cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Backend source configuration
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Outbound rate limiting for the live source
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Merge engine thresholds
    #[serde(default)]
    pub merge: MergeConfig,

    /// Selection policy settings
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// TTL for catalog results in seconds
    #[serde(default = "default_catalog_ttl")]
    pub catalog_ttl_secs: u64,

    /// TTL for live results in seconds (prices move faster)
    #[serde(default = "default_live_ttl")]
    pub live_ttl_secs: u64,

    /// Maximum entries per cache instance
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Directory for write-behind persistence (disabled when unset)
    pub persist_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// Catalog similarity-search endpoint
    pub catalog_url: Option<String>,

    /// Live web-search endpoint
    pub live_url: Option<String>,

    /// Per-call timeout for the catalog adapter in milliseconds
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_ms: u64,

    /// Per-call timeout for the live adapter in milliseconds
    #[serde(default = "default_live_timeout")]
    pub live_timeout_ms: u64,

    /// Catalog results requested per query
    #[serde(default = "default_k")]
    pub catalog_k: usize,

    /// Live results requested per query
    #[serde(default = "default_k")]
    pub live_k: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Maximum live-source requests per rolling minute
    #[serde(default = "default_live_rpm")]
    pub live_requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MergeConfig {
    /// Minimum title similarity accepted as the same product
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Relative catalog/live price gap flagged as a discrepancy
    #[serde(default = "default_discrepancy_threshold")]
    pub discrepancy_threshold: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Records handed to answer generation
    #[serde(default = "default_result_count")]
    pub result_count: usize,

    /// Catalog relevance counted as "relevant" for availability checks
    #[serde(default = "default_min_relevance")]
    pub min_relevance: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 30 }
fn default_catalog_ttl() -> u64 { 360 }
fn default_live_ttl() -> u64 { 180 }
fn default_max_entries() -> usize { 1000 }
fn default_catalog_timeout() -> u64 { 3000 }
fn default_live_timeout() -> u64 { 8000 }
fn default_k() -> usize { 5 }
fn default_live_rpm() -> u32 { 30 }
fn default_match_threshold() -> f64 { 0.72 }
fn default_discrepancy_threshold() -> f64 { 0.20 }
fn default_result_count() -> usize { crate::DEFAULT_RESULT_COUNT }
fn default_min_relevance() -> f64 { 0.3 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "shopwise".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            catalog_ttl_secs: default_catalog_ttl(),
            live_ttl_secs: default_live_ttl(),
            max_entries: default_max_entries(),
            persist_dir: None,
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            catalog_url: None,
            live_url: None,
            catalog_timeout_ms: default_catalog_timeout(),
            live_timeout_ms: default_live_timeout(),
            catalog_k: default_k(),
            live_k: default_k(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            live_requests_per_minute: default_live_rpm(),
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            discrepancy_threshold: default_discrepancy_threshold(),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            result_count: default_result_count(),
            min_relevance: default_min_relevance(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> crate::Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__CACHE__LIVE_TTL_SECS=120
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.catalog_ttl_secs)
    }

    pub fn live_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.live_ttl_secs)
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_millis(self.sources.catalog_timeout_ms)
    }

    pub fn live_timeout(&self) -> Duration {
        Duration::from_millis(self.sources.live_timeout_ms)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            cache: CacheSettings::default(),
            sources: SourcesConfig::default(),
            rate_limit: RateLimitConfig::default(),
            merge: MergeConfig::default(),
            selection: SelectionConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
