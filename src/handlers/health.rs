//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers. It never contacts
//! the remote systems.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Systems with a usable credential
    pub systems: usize,
    /// Configured metric definitions
    pub metrics: usize,
    /// Scrapes served since startup
    pub scrapes: u64,
    /// Scrapes cut short by the deadline since startup
    pub incomplete_scrapes: u64,
}

/// Health check handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let catalog = state.collector().catalog();
    let metrics = state.metrics();

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            systems: catalog.systems().len(),
            metrics: catalog.metrics().len(),
            scrapes: metrics.scrapes_count(),
            incomplete_scrapes: metrics.incomplete_scrapes_count(),
        }),
    )
}
