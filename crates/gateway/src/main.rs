//! LexRAG API Gateway
//!
//! HTTP front end for legal question answering.
//! Handles:
//! - Loading the persisted index and model clients once at startup
//! - Request routing
//! - Observability (logging, metrics, request ids)

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use lexrag_common::{
    config::{AppConfig, ObservabilityConfig},
    embeddings::create_embedder,
    generation::create_generator,
    metrics::{self, EMBEDDING_BUCKETS, METRICS_PREFIX, QUERY_BUCKETS},
    telemetry::init_tracing,
};
use lexrag_context::QueryEngine;
use lexrag_search::{IndexInfo, Retriever, VectorIndex};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub engine: Arc<QueryEngine>,
    pub index: Arc<IndexInfo>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.observability);
    info!("Starting LexRAG API Gateway v{}", lexrag_common::VERSION);

    config.validate()?;
    let config = Arc::new(config);

    // Initialize metrics
    install_metrics_exporter(&config.observability)?;
    metrics::register_metrics();

    // Model clients and the index are created once and shared by every request
    let embedder = create_embedder(&config.embedding)?;
    info!(path = %config.index.path.display(), "Loading vector index...");
    let index = VectorIndex::load(&config.index.path, embedder.as_ref())?;
    let index_info = Arc::new(index.info());

    let generator = create_generator(&config.generation)?;
    let retriever = Retriever::new(Arc::new(index), embedder);
    let engine = QueryEngine::from_config(&config, retriever, generator)?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        engine: Arc::new(engine),
        index: index_info,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, app, config.shutdown_timeout()).await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Serve until a shutdown signal, then drain for at most `drain_timeout`
async fn serve(
    listener: tokio::net::TcpListener,
    app: Router,
    drain_timeout: Duration,
) -> std::io::Result<()> {
    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    tokio::select! {
        result = server.into_future() => result,
        _ = async {
            let _ = stop_rx.wait_for(|stopped| *stopped).await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            warn!(timeout_secs = drain_timeout.as_secs(), "Shutdown timeout elapsed, dropping open connections");
            Ok(())
        }
    }
}

/// Install the Prometheus exporter on its own listener
fn install_metrics_exporter(config: &ObservabilityConfig) -> Result<(), BuildError> {
    if config.metrics_port == 0 {
        info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let latency = |name: &str| Matcher::Full(format!("{}_{}", METRICS_PREFIX, name));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(latency("request_duration_seconds"), QUERY_BUCKETS)?
        .set_buckets_for_metric(latency("query_duration_seconds"), QUERY_BUCKETS)?
        .set_buckets_for_metric(latency("generation_duration_seconds"), QUERY_BUCKETS)?
        .set_buckets_for_metric(latency("embedding_duration_seconds"), EMBEDDING_BUCKETS)?
        .install()?;

    info!(%addr, "Metrics exporter listening");
    Ok(())
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

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Question answering
        .route("/query", post(handlers::query::query))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
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
