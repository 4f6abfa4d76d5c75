//! Scrape ID middleware for log correlation
//!
//! Generates a unique UUID for each incoming request and makes it available to the
//! handlers via Axum extensions. The `/metrics` handler attaches it to the collection
//! span, so every log line of one scrape carries the same id.

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

/// Scrape ID header name
pub const SCRAPE_ID_HEADER: &str = "x-request-id";

/// Scrape ID wrapper type for Axum extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeId(pub Uuid);

impl ScrapeId {
    /// Generate a new random scrape ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ScrapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ScrapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Middleware that generates and attaches a scrape ID to each request
///
/// The ID is inserted into the request extensions and echoed in the
/// `x-request-id` response header.
pub async fn scrape_id_middleware(mut request: Request, next: Next) -> Response {
    let scrape_id = ScrapeId::new();

    tracing::debug!(
        scrape_id = %scrape_id,
        method = %request.method(),
        uri = %request.uri(),
        "Incoming request"
    );

    request.extensions_mut().insert(scrape_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = HeaderValue::from_str(&scrape_id.to_string()) {
        response
            .headers_mut()
            .insert(SCRAPE_ID_HEADER, header_value);
    }

    response
}
