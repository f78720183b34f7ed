//! Cache introspection handlers

use axum::{extract::State, Json};
use serde::Serialize;
use shopwise_common::CacheStats;

use crate::AppState;

#[derive(Serialize)]
pub struct CacheStatsResponse {
    pub catalog: CacheStats,
    pub live: CacheStats,
}

/// Size and hit-rate of both source caches
pub async fn stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let (catalog, live) = tokio::join!(state.caches.catalog.stats(), state.caches.live.stats());
    Json(CacheStatsResponse { catalog, live })
}
