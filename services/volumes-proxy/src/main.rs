//! IBM Cloud Volumes Proxy
//!
//! Single-binary service that:
//! 1. Exchanges an IBM Cloud API key for an IAM token (`POST /auth/token`)
//! 2. Keeps that token in a local JSON record
//! 3. Lists storage-broker volumes with the stored token (`POST /call/volumes`)
//! 4. Serves the static dashboard under `/dashboard`

mod auth;
mod config;
mod error;
mod metrics;
mod volumes;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use ibm_auth::{FileTokenStore, TokenManager};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::volumes::VolumesProxy;

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    tokens: Arc<TokenManager>,
    volumes: VolumesProxy,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
fn build_router(state: AppState, dashboard_dir: &Path) -> Router {
    Router::new()
        .route("/auth/token", post(auth::token_handler))
        .route("/auth/check", get(auth::check_handler))
        .route("/call/volumes", post(volumes::volumes_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest_service("/dashboard", ServeDir::new(dashboard_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting ibm-volumes-proxy");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder()?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config = match Config::resolve_path(cli_config_path) {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            Config::load(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))?
        }
        None => Config::load_default().context("failed to load default configuration")?,
    };

    info!(
        listen_addr = %config.server.listen_addr,
        iam_url = %config.iam.url,
        volumes_url = %config.volumes.url,
        instance_id = %config.volumes.instance_id,
        transport = ?config.volumes.transport,
        token_file = %config.server.token_file.display(),
        "configuration loaded"
    );

    if !config.server.dashboard_dir.is_dir() {
        warn!(
            dir = %config.server.dashboard_dir.display(),
            "dashboard directory missing, /dashboard will return 404"
        );
    }

    let client = reqwest::Client::new();
    let store = Arc::new(FileTokenStore::new(&config.server.token_file));
    let tokens = Arc::new(TokenManager::new(
        client.clone(),
        config.iam.url.clone(),
        store,
    ));
    let transport = config.volumes.transport.build(
        config.volumes.headers.clone(),
        &config.volumes.token_query_param,
    );
    let volumes = VolumesProxy::new(client, tokens.clone(), transport, &config.volumes);

    if tokens.is_authenticated().await {
        info!("found saved IAM token");
    }

    let app_state = AppState {
        tokens,
        volumes,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let app = build_router(app_state, &config.server.dashboard_dir);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("shutdown complete");
    Ok(())
}

/// Liveness plus whether a token is currently stored.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let authenticated = state.tokens.is_authenticated().await;
    axum::Json(serde_json::json!({
        "status": "healthy",
        "authenticated": authenticated,
        "transport": state.volumes.transport_id(),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}

/// Prometheus metrics endpoint in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
