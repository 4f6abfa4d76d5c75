//! Prometheus scrape endpoint
//!
//! Every request runs one collection against the configured systems and returns the
//! result in Prometheus text format, followed by the exporter's own metrics.

use axum::{
    Extension,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Instant;
use tracing::Instrument;

use crate::exposition;
use crate::handlers::AppState;
use crate::middleware::ScrapeId;

/// Metrics handler for Prometheus scraping
///
/// # Response
///
/// - `200 OK` with whatever could be collected before the scrape deadline
/// - `500 Internal Server Error` only if text encoding fails
///
/// # Example
///
/// ```bash
/// curl http://localhost:9663/metrics
/// # HELP sap_processes Number of work processes
/// # TYPE sap_processes gauge
/// sap_processes{count="wp_typ_dia",server="sapd01",system="d01",usage="development"} 10
/// ```
pub async fn handler(
    State(state): State<AppState>,
    scrape_id: Option<Extension<ScrapeId>>,
) -> Response {
    let scrape_id = scrape_id.map(|Extension(id)| id).unwrap_or_default();
    let span = tracing::info_span!("scrape", scrape_id = %scrape_id);

    async move {
        let started = Instant::now();
        let snapshot = state.collector().collect().await;

        if let Err(e) = state.metrics().record_scrape(
            started.elapsed().as_secs_f64(),
            snapshot.complete,
            snapshot.record_count(),
        ) {
            tracing::warn!(error = %e, "Failed to record scrape metrics");
        }

        match exposition::render(&snapshot, state.metrics()) {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Failed to encode metrics for Prometheus scraping"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to encode metrics: {}", e),
                )
                    .into_response()
            }
        }
    }
    .instrument(span)
    .await
}
