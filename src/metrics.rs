//! Prometheus self-metrics for the exporter
//!
//! This module tracks the exporter's own behaviour:
//! - Scrapes served and how long collection took
//! - Scrapes cut short by the deadline
//! - Branch failures by pipeline stage
//! - Records emitted
//!
//! These are appended to every `/metrics` response after the collected SAP metrics.

use prometheus::proto::MetricFamily;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Name prefix of every self-metric; user metrics may not use it
pub const SELF_METRIC_PREFIX: &str = "nwrfc_exporter_";

/// Pipeline stage a branch failure happened in
///
/// Restricting the label to this enum keeps the `stage` cardinality fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Password missing or not decryptable
    Credential,
    /// Session could not be opened
    Connection,
    /// Server list lookup failed
    Topology,
    /// Function call failed
    Call,
    /// Result did not have the expected shape
    Extraction,
    /// A single value was not numeric
    Coercion,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Credential,
        Stage::Connection,
        Stage::Topology,
        Stage::Call,
        Stage::Extraction,
        Stage::Coercion,
    ];

    /// Convert stage to Prometheus label string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Credential => "credential",
            Stage::Connection => "connection",
            Stage::Topology => "topology",
            Stage::Call => "call",
            Stage::Extraction => "extraction",
            Stage::Coercion => "coercion",
        }
    }
}

/// Exporter self-metrics
#[derive(Clone)]
pub struct Metrics {
    pub registry: Arc<Registry>,
    scrapes_total: IntCounter,
    scrape_duration: Histogram,
    incomplete_scrapes: IntCounter,
    branch_failures: IntCounterVec,
    records_total: IntCounter,
}

impl Metrics {
    /// Create a new Metrics instance
    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails (e.g., duplicate names).
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let scrapes_total = IntCounter::with_opts(Opts::new(
            "nwrfc_exporter_scrapes_total",
            "Total number of scrapes served",
        ))?;

        // Buckets span sub-second scrapes up to the maximum scrape timeout
        let scrape_duration = Histogram::with_opts(
            HistogramOpts::new(
                "nwrfc_exporter_scrape_duration_seconds",
                "Time spent collecting metrics for one scrape",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        )?;

        let incomplete_scrapes = IntCounter::with_opts(Opts::new(
            "nwrfc_exporter_incomplete_scrapes_total",
            "Scrapes where the deadline cut collection short",
        ))?;

        // Cardinality: 6 stages
        let branch_failures = IntCounterVec::new(
            Opts::new(
                "nwrfc_exporter_branch_failures_total",
                "Failed collection branches by pipeline stage",
            ),
            &["stage"],
        )?;

        let records_total = IntCounter::with_opts(Opts::new(
            "nwrfc_exporter_records_total",
            "Total number of metric records collected",
        ))?;

        registry.register(Box::new(scrapes_total.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(incomplete_scrapes.clone()))?;
        registry.register(Box::new(branch_failures.clone()))?;
        registry.register(Box::new(records_total.clone()))?;

        // Pre-create every stage so all series are visible from the first scrape
        for stage in Stage::ALL {
            branch_failures.with_label_values(&[stage.as_str()]);
        }

        Ok(Self {
            registry: Arc::new(registry),
            scrapes_total,
            scrape_duration,
            incomplete_scrapes,
            branch_failures,
            records_total,
        })
    }

    /// Record a finished scrape
    ///
    /// # Errors
    ///
    /// Returns an error if `duration_secs` is NaN, infinite or negative; such values
    /// would corrupt the histogram.
    pub fn record_scrape(
        &self,
        duration_secs: f64,
        complete: bool,
        records: usize,
    ) -> Result<(), prometheus::Error> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(prometheus::Error::Msg(format!(
                "Scrape duration must be finite and non-negative, got: {}",
                duration_secs
            )));
        }

        self.scrapes_total.inc();
        self.scrape_duration.observe(duration_secs);
        if !complete {
            self.incomplete_scrapes.inc();
        }
        self.records_total.inc_by(records as u64);
        Ok(())
    }

    /// Count one failed branch
    pub fn branch_failure(&self, stage: Stage) {
        self.branch_failures
            .with_label_values(&[stage.as_str()])
            .inc();
    }

    pub fn branch_failures_count(&self, stage: Stage) -> u64 {
        self.branch_failures
            .with_label_values(&[stage.as_str()])
            .get()
    }

    pub fn scrapes_count(&self) -> u64 {
        self.scrapes_total.get()
    }

    pub fn incomplete_scrapes_count(&self) -> u64 {
        self.incomplete_scrapes.get()
    }

    /// Encode the self-metrics in Prometheus text format
    ///
    /// # Errors
    ///
    /// Returns an error if metric encoding fails.
    pub fn gather(&self) -> Result<String, prometheus::Error> {
        encode(&self.registry.gather())
    }
}

/// Encode metric families in Prometheus text format
pub fn encode(metric_families: &[MetricFamily]) -> Result<String, prometheus::Error> {
    let metric_count = metric_families.len();

    tracing::debug!(
        metric_family_count = metric_count,
        "Encoding metrics to Prometheus text format"
    );

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();

    encoder.encode(metric_families, &mut buffer).map_err(|e| {
        let metric_names: Vec<_> = metric_families.iter().map(|mf| mf.name()).collect();

        tracing::error!(
            error = %e,
            metric_family_count = metric_count,
            metric_names = ?metric_names,
            "Prometheus text encoder failed"
        );

        prometheus::Error::Msg(format!(
            "Failed to encode {} metric families: {}. Metrics: {:?}",
            metric_count, e, metric_names
        ))
    })?;

    String::from_utf8(buffer).map_err(|e| {
        let valid_up_to = e.utf8_error().valid_up_to();

        tracing::error!(
            invalid_byte_index = valid_up_to,
            "Prometheus encoder produced invalid UTF-8"
        );

        prometheus::Error::Msg(format!(
            "Failed to convert metrics to UTF-8 at byte {}: {}",
            valid_up_to, e
        ))
    })
}
