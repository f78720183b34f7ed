//! Shopwise API Gateway
//!
//! HTTP front for the retrieval pipeline.
//! Handles:
//! - Question intake and validation
//! - Intent classification when the caller sends none
//! - Cache introspection
//! - Observability (logging, metrics)

mod handlers;
mod sources;

use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use shopwise_common::{
    config::{AppConfig, ObservabilityConfig},
    errors::AppError,
    metrics,
};
use shopwise_retrieval::{
    sources::{CatalogAdapter, LiveAdapter},
    FetchSettings, IntentClassifier, KeywordClassifier, MergeEngine, Orchestrator, Pipeline, RulePlanner,
    SelectionPolicy, SourceCaches,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<Pipeline>,
    pub classifier: Arc<dyn IntentClassifier>,
    pub caches: SourceCaches,
}

impl AppState {
    /// Wire caches, adapters, and the pipeline from configuration
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let caches = SourceCaches::from_settings(&config.cache);

        let catalog = CatalogAdapter::new(sources::catalog_backend(&config)?, caches.catalog.clone());
        let live = LiveAdapter::new(
            sources::live_backend(&config)?,
            caches.live.clone(),
            config.rate_limit.live_requests_per_minute,
        );

        let orchestrator = Orchestrator::new(
            Arc::new(catalog),
            Arc::new(live),
            MergeEngine::from_config(&config.merge),
            SelectionPolicy::from_config(&config.selection),
            FetchSettings::from_config(&config),
        );

        Ok(Self {
            pipeline: Arc::new(Pipeline::new(Arc::new(RulePlanner::new()), orchestrator)),
            classifier: Arc::new(KeywordClassifier::new()),
            caches,
            config: Arc::new(config),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting Shopwise API Gateway v{}",
        shopwise_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        start_metrics_server(config.observability.metrics_port).await?;
    }
    metrics::register_metrics();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Create app state
    let state = AppState::from_config(config)?;
    spawn_cache_sweeper(&state);

    // Build the router
    let app = create_router(state);

    // Start the server
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Install the Prometheus recorder and serve `/metrics` on its own port
async fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            metrics::SOURCE_LATENCY_BUCKETS,
        )?
        .install_recorder()?;

    let app = Router::new().route("/metrics", get(move || async move { handle.render() }));
    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    info!(port, "Metrics endpoint listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Metrics server stopped");
        }
    });
    Ok(())
}

/// Periodically drop expired cache entries
fn spawn_cache_sweeper(state: &AppState) {
    let caches = state.caches.clone();
    let period = state.config.live_ttl().max(std::time::Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = caches.catalog.cleanup_expired().await + caches.live.cleanup_expired().await;
            debug!(removed, "Cache sweep completed");
        }
    });
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        .route("/retrieve", post(handlers::retrieve::retrieve))
        .route("/cache/stats", get(handlers::cache::stats));

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
