//! Source backend wiring

use async_trait::async_trait;
use shopwise_common::config::AppConfig;
use shopwise_common::errors::{AppError, Result};
use shopwise_retrieval::sources::{
    CatalogBackend, CatalogHit, HttpCatalogBackend, HttpLiveBackend, LiveBackend, WebHit,
};
use shopwise_retrieval::SearchFilters;
use std::sync::Arc;
use tracing::warn;

/// Stand-in for a source whose endpoint is not configured
pub struct Unconfigured {
    source: &'static str,
}

#[async_trait]
impl CatalogBackend for Unconfigured {
    async fn similarity_search(&self, _query: &str, _filters: &SearchFilters, _k: usize) -> Result<Vec<CatalogHit>> {
        Err(AppError::unavailable(self.source, "endpoint not configured"))
    }
}

#[async_trait]
impl LiveBackend for Unconfigured {
    async fn web_search(&self, _query: &str, _k: usize) -> Result<Vec<WebHit>> {
        Err(AppError::unavailable(self.source, "endpoint not configured"))
    }
}

pub fn catalog_backend(config: &AppConfig) -> Result<Arc<dyn CatalogBackend>> {
    match config.sources.catalog_url.as_deref() {
        Some(url) => Ok(Arc::new(HttpCatalogBackend::new(url, config.catalog_timeout())?)),
        None => {
            warn!("Catalog endpoint not configured; catalog source will report unavailable");
            Ok(Arc::new(Unconfigured { source: "catalog" }))
        }
    }
}

pub fn live_backend(config: &AppConfig) -> Result<Arc<dyn LiveBackend>> {
    match config.sources.live_url.as_deref() {
        Some(url) => Ok(Arc::new(HttpLiveBackend::new(url, config.live_timeout())?)),
        None => {
            warn!("Live endpoint not configured; live source will report unavailable");
            Ok(Arc::new(Unconfigured { source: "live" }))
        }
    }
}
