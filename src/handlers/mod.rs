//! HTTP request handlers for the exporter

use crate::collector::Collector;
use crate::config::Config;
use crate::metrics::Metrics;
use std::sync::Arc;

pub mod health;
pub mod metrics;
pub mod root;

/// Application state shared across all handlers
///
/// All fields are Arc'd for cheap cloning across Axum handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    collector: Arc<Collector>,
}

impl AppState {
    pub fn new(config: Arc<Config>, collector: Collector) -> Self {
        Self {
            config,
            collector: Arc::new(collector),
        }
    }

    /// Get reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn collector(&self) -> &Collector {
        &self.collector
    }

    /// Exporter self-metrics
    pub fn metrics(&self) -> &Metrics {
        self.collector.metrics()
    }
}
