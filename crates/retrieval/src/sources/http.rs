//! HTTP backends for the catalog and live sources
//!
//! Both endpoints take a JSON POST and answer with either
//! `{"results": [...]}` or a bare JSON array.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use shopwise_common::errors::{AppError, Result};
use std::time::Duration;
use tracing::debug;

use super::{CatalogBackend, CatalogHit, LiveBackend, WebHit};
use crate::planner::SearchFilters;

#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsBody<T> {
    Wrapped { results: Vec<T> },
    Bare(Vec<T>),
}

impl<T> ResultsBody<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ResultsBody::Wrapped { results } => results,
            ResultsBody::Bare(results) => results,
        }
    }
}

#[derive(Serialize)]
struct CatalogRequest<'a> {
    query: &'a str,
    k: usize,
    filters: &'a SearchFilters,
}

#[derive(Serialize)]
struct LiveRequest<'a> {
    query: &'a str,
    k: usize,
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

async fn post_for_results<B, T>(client: &reqwest::Client, source: &str, url: &str, body: &B) -> Result<Vec<T>>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| AppError::unavailable(source, format!("Request failed: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(AppError::unavailable(source, format!("API error {}: {}", status, text)));
    }

    let parsed: ResultsBody<T> = response
        .json()
        .await
        .map_err(|e| AppError::unavailable(source, format!("Failed to parse response: {}", e)))?;

    let results = parsed.into_vec();
    debug!(source, results = results.len(), "Backend responded");
    Ok(results)
}

/// Catalog similarity search over HTTP
pub struct HttpCatalogBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalogBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self { client: build_client(timeout)?, url: url.into() })
    }
}

#[async_trait]
impl CatalogBackend for HttpCatalogBackend {
    async fn similarity_search(&self, query: &str, filters: &SearchFilters, k: usize) -> Result<Vec<CatalogHit>> {
        let request = CatalogRequest { query, k, filters };
        post_for_results(&self.client, "catalog", &self.url, &request).await
    }
}

/// Web search over HTTP
pub struct HttpLiveBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpLiveBackend {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self { client: build_client(timeout)?, url: url.into() })
    }
}

#[async_trait]
impl LiveBackend for HttpLiveBackend {
    async fn web_search(&self, query: &str, k: usize) -> Result<Vec<WebHit>> {
        let request = LiveRequest { query, k };
        post_for_results(&self.client, "live", &self.url, &request).await
    }
}
