//! Retrieval handler

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use shopwise_common::errors::{AppError, Result};
use shopwise_retrieval::{Constraints, Intent, PipelineResult};

/// Retrieval request
///
/// When `intent` is absent the keyword classifier supplies both the intent
/// and any constraints the request did not carry.
#[derive(Debug, Deserialize, Validate)]
pub struct RetrieveRequest {
    #[validate(length(min = 1, max = 1000))]
    pub query: String,

    #[serde(default)]
    pub intent: Option<Intent>,

    #[serde(default)]
    pub constraints: Option<Constraints>,
}

#[derive(Serialize)]
pub struct RetrieveResponse {
    #[serde(flatten)]
    pub result: PipelineResult,
    /// Intent came from the built-in classifier
    pub classified: bool,
    pub processing_time_ms: u64,
}

/// Run the retrieval pipeline for one question
pub async fn retrieve(
    State(state): State<AppState>,
    Json(request): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>> {
    let start = Instant::now();

    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("query".to_string()),
    })?;

    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation {
            message: "query must not be blank".to_string(),
            field: Some("query".to_string()),
        });
    }

    let (intent, constraints, classified) = match request.intent {
        Some(intent) => (intent, request.constraints.unwrap_or_default(), false),
        None => {
            let classification = state.classifier.classify(query);
            let constraints = request.constraints.unwrap_or(classification.constraints);
            (classification.intent, constraints, true)
        }
    };

    let timeout = state.config.request_timeout();
    let result = tokio::time::timeout(timeout, state.pipeline.answer(query, intent, &constraints))
        .await
        .map_err(|_| AppError::SourceTimeout {
            source_name: "pipeline".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        })?;
    let processing_time_ms = start.elapsed().as_millis() as u64;

    tracing::info!(
        query = %query,
        intent = %intent,
        classified,
        retrieval_performed = result.retrieval_performed,
        latency_ms = processing_time_ms,
        "Retrieve completed"
    );

    Ok(Json(RetrieveResponse {
        result,
        classified,
        processing_time_ms,
    }))
}
