//! SubQuery API Gateway
//!
//! HTTP front end of the sub-question engine.
//! Handles:
//! - Query answering and tool listing
//! - Rate limiting and request timeouts
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use middleware::rate_limit::{rate_limit_middleware, GlobalRateLimiter};
use std::net::SocketAddr;
use std::sync::Arc;
use subquery_common::{config::AppConfig, errors::Result, llm, metrics, telemetry};
use subquery_engine::SubQuestionQueryEngine;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<SubQuestionQueryEngine>,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    telemetry::init_tracing(&config.observability);
    info!("Starting SubQuery API Gateway v{}", subquery_common::VERSION);

    // Initialize metrics
    if config.observability.metrics_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter()?.with_http_listener(addr).install()?;
        info!("Metrics exporter listening on {}", addr);
    }
    metrics::register_metrics();

    // Build the engine
    let model = llm::create_chat_model(&config.llm)?;
    let engine = SubQuestionQueryEngine::from_config(&config, model)?;
    if engine.tools().is_empty() {
        tracing::warn!("No tools configured; every query will be answered without evidence");
    }

    let state = AppState {
        config: config.clone(),
        engine: Arc::new(engine),
    };

    let app = create_router(state)?;

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Prometheus exporter with histogram buckets for query latency
fn metrics_exporter() -> std::result::Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(format!("{}_query_duration_seconds", metrics::METRICS_PREFIX)),
        metrics::QUERY_BUCKETS,
    )
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let mut api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/tools", get(handlers::tools::list_tools))
        .route("/query", post(handlers::query::query));

    if state.config.rate_limit.enabled {
        let limiter = GlobalRateLimiter::from_config(&state.config.rate_limit)?;
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ));
    }

    let timeout = state.config.request_timeout();

    Ok(Router::new()
        .nest("/v1", api_routes)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state))
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
