//! Concurrent collection pipeline
//!
//! One scrape fans out three levels deep: a task per metric, a task per matching system
//! within a metric, and a task per application server within a system. Every task gets
//! the same [`ScrapeDeadline`]. Merge sites stop waiting at the deadline, inner levels
//! first, and keep whatever arrived; tasks still running are left to finish on their own
//! and check the deadline before their next remote call.
//!
//! Failures never cross branch boundaries. A failed connect, call or extraction is
//! logged, counted in [`crate::metrics::Metrics`] and contributes zero records.

pub mod deadline;
pub mod extract;
pub mod gate;
mod resolver;
mod server;
mod system;

pub use deadline::{MergeLevel, ScrapeDeadline};
pub use extract::{Extracted, coerce, extract};
pub use gate::CallGate;

use crate::metrics::Metrics;
use crate::models::{Catalog, CollectionSnapshot, MetricRecord, MetricSamples};
use crate::rfc::Connector;
use crate::secret::CredentialStore;
use deadline::merge_until;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::Instrument;

/// Everything a collection task needs, cloned into each task
#[derive(Clone)]
pub(crate) struct ScrapeContext {
    pub connector: Arc<dyn Connector>,
    pub credentials: Arc<CredentialStore>,
    pub gate: CallGate,
    pub deadline: ScrapeDeadline,
    pub metrics: Arc<Metrics>,
}

/// Records gathered by one branch and whether the branch finished before its cutoff
#[derive(Debug)]
pub(crate) struct Collected {
    pub records: Vec<MetricRecord>,
    pub complete: bool,
}

impl Collected {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            complete: true,
        }
    }

    /// Flatten children gathered by a merge site
    pub fn merge(children: Vec<Collected>, merged_in_time: bool) -> Self {
        let mut complete = merged_in_time;
        let mut records = Vec::new();
        for child in children {
            complete &= child.complete;
            records.extend(child.records);
        }
        Self { records, complete }
    }
}

/// Collection orchestrator
///
/// Holds the read-only catalog, credentials and connector. Each call to
/// [`Collector::collect`] runs one independent scrape.
#[derive(Clone)]
pub struct Collector {
    catalog: Arc<Catalog>,
    credentials: Arc<CredentialStore>,
    connector: Arc<dyn Connector>,
    gate: CallGate,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Collector {
    /// Create a collector with an unbounded call gate
    pub fn new(
        catalog: Arc<Catalog>,
        credentials: CredentialStore,
        connector: Arc<dyn Connector>,
        timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            catalog,
            credentials: Arc::new(credentials),
            connector,
            gate: CallGate::unbounded(),
            timeout,
            metrics,
        }
    }

    /// Limit simultaneous connects and calls
    pub fn with_gate(mut self, gate: CallGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run one scrape and return whatever was collected before the deadline
    pub async fn collect(&self) -> CollectionSnapshot {
        let started = Instant::now();
        let deadline = ScrapeDeadline::after(self.timeout);
        let ctx = ScrapeContext {
            connector: Arc::clone(&self.connector),
            credentials: Arc::clone(&self.credentials),
            gate: self.gate.clone(),
            deadline,
            metrics: Arc::clone(&self.metrics),
        };

        let (tx, rx) = mpsc::unbounded_channel();
        for metric in self.catalog.metrics() {
            let ctx = ctx.clone();
            let metric = Arc::clone(metric);
            let catalog = Arc::clone(&self.catalog);
            let tx = tx.clone();
            let span = tracing::debug_span!("metric", metric = %metric.name());
            tokio::spawn(
                async move {
                    let collected =
                        system::collect_metric(ctx, Arc::clone(&metric), catalog).await;
                    // The receiver is gone once the merge gave up; late results are dropped
                    let _ = tx.send((metric, collected));
                }
                .instrument(span),
            );
        }
        drop(tx);

        let merged = merge_until(rx, deadline.cutoff(MergeLevel::Metrics)).await;
        let mut complete = merged.complete;
        let samples: Vec<MetricSamples> = merged
            .items
            .into_iter()
            .map(|(metric, collected)| {
                complete &= collected.complete;
                MetricSamples {
                    metric,
                    records: collected.records,
                }
            })
            .collect();

        let snapshot = CollectionSnapshot { samples, complete };
        if complete {
            tracing::debug!(
                metrics = snapshot.samples.len(),
                records = snapshot.record_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Collection finished"
            );
        } else {
            tracing::warn!(
                metrics = snapshot.samples.len(),
                records = snapshot.record_count(),
                timeout_secs = self.timeout.as_secs(),
                "Scrape deadline expired, returning partial results"
            );
        }
        snapshot
    }
}
