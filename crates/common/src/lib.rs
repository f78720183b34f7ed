//! Shopwise Common Library
//!
//! Shared code for the Shopwise retrieval services including:
//! - Error types and handling
//! - Configuration management
//! - In-process TTL/LRU cache with write-behind persistence
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheStats, TtlCache};
pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of records handed to answer generation
pub const DEFAULT_RESULT_COUNT: usize = 3;
