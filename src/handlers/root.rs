//! Landing page

/// Plain-text hint pointing at the scrape endpoint
pub async fn handler() -> &'static str {
    "prometheus nwrfc_exporter: please call <host>:<port>/metrics"
}
