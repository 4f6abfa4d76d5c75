//! HTTP application wiring
//!
//! Builds the Axum router for the exporter and serves it on the configured address.

use crate::error::{AppError, AppResult};
use crate::handlers::{self, AppState};
use crate::middleware::scrape_id_middleware;
use axum::{Router, routing::get};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Build the router with all routes and layers
///
/// `http_timeout` bounds the whole request, including writing a partial snapshot after
/// the scrape deadline expired.
pub fn router(state: AppState, http_timeout: Duration) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics::handler))
        .route("/health", get(handlers::health::handler))
        .route("/", get(handlers::root::handler))
        .layer(axum::middleware::from_fn(scrape_id_middleware))
        .layer(TimeoutLayer::new(http_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Resolve the listen address
///
/// An empty host binds every interface.
pub fn listen_addr(host: &str, port: u16) -> AppResult<SocketAddr> {
    let ip = if host.trim().is_empty() {
        IpAddr::from([0, 0, 0, 0])
    } else {
        host.trim()
            .parse::<IpAddr>()
            .map_err(|e| AppError::Config(format!("server.host '{}' is invalid: {}", host, e)))?
    };
    Ok(SocketAddr::from((ip, port)))
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState) -> AppResult<()> {
    let config = state.config();
    let addr = listen_addr(&config.server.host, config.server.port)?;
    let app = router(state.clone(), config.http_timeout());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Internal(format!("cannot bind {}: {}", addr, e)))?;

    tracing::info!(
        addr = %addr,
        systems = state.collector().catalog().systems().len(),
        metrics = state.collector().catalog().metrics().len(),
        timeout_secs = state.collector().timeout().as_secs(),
        "Exporter listening"
    );
    tracing::info!("Metrics available at http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("server error: {}", e)))
}
