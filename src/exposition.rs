//! Map a collection snapshot onto Prometheus metric families
//!
//! A fresh registry is built for every scrape, so series that disappear from the remote
//! systems disappear from the output as well.

use crate::metrics::{self, Metrics};
use crate::models::{CollectionSnapshot, MetricSamples, MetricType};
use prometheus::core::Collector;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, GaugeVec, Opts, Registry};
use std::collections::HashSet;

/// Encode `snapshot` followed by the exporter's own metrics in text format
///
/// # Errors
///
/// Fails only if text encoding fails. Samples that cannot be represented are skipped
/// and logged.
pub fn render(snapshot: &CollectionSnapshot, self_metrics: &Metrics) -> Result<String, prometheus::Error> {
    let mut families = snapshot_families(snapshot);
    families.extend(self_metrics.registry.gather());
    metrics::encode(&families)
}

/// Metric families for every metric of the snapshot that has records
pub fn snapshot_families(snapshot: &CollectionSnapshot) -> Vec<MetricFamily> {
    let registry = Registry::new();

    for samples in &snapshot.samples {
        if samples.records.is_empty() {
            continue;
        }
        let collector = match build_collector(samples) {
            Ok(collector) => collector,
            Err(e) => {
                tracing::warn!(
                    metric = %samples.metric.name(),
                    error = %e,
                    "Cannot build metric, skipping"
                );
                continue;
            }
        };
        if let Err(e) = registry.register(collector) {
            tracing::warn!(
                metric = %samples.metric.name(),
                error = %e,
                "Cannot register metric, skipping"
            );
        }
    }

    registry.gather()
}

fn build_collector(samples: &MetricSamples) -> Result<Box<dyn Collector>, prometheus::Error> {
    let metric = &samples.metric;
    // Records of one metric share the label layout of the first one
    let label_names: Vec<&str> = samples.records[0]
        .label_names()
        .iter()
        .map(String::as_str)
        .collect();
    let opts = Opts::new(metric.name(), metric.help());

    let mut seen: HashSet<&[String]> = HashSet::new();
    let accepted = samples.records.iter().filter(|record| {
        if record.label_names() != samples.records[0].label_names() {
            tracing::warn!(
                metric = %metric.name(),
                labels = ?record.label_names(),
                "Record label names differ from the first record, skipping"
            );
            return false;
        }
        if !seen.insert(record.label_values()) {
            tracing::warn!(
                metric = %metric.name(),
                labels = ?record.label_values(),
                "Duplicate series in one scrape, skipping"
            );
            return false;
        }
        true
    });

    match metric.metric_type() {
        MetricType::Gauge => {
            let gauge = GaugeVec::new(opts, &label_names)?;
            for record in accepted {
                gauge
                    .get_metric_with_label_values(record.label_values())?
                    .set(record.value());
            }
            Ok(Box::new(gauge))
        }
        MetricType::Counter => {
            let counter = CounterVec::new(opts, &label_names)?;
            for record in accepted {
                let value = record.value();
                if !value.is_finite() || value < 0.0 {
                    tracing::warn!(
                        metric = %metric.name(),
                        value,
                        "Counter value must be finite and non-negative, skipping"
                    );
                    continue;
                }
                counter
                    .get_metric_with_label_values(record.label_values())?
                    .inc_by(value);
            }
            Ok(Box::new(counter))
        }
    }
}
