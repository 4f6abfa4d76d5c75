//! Metric records and the per-scrape snapshot

use super::{MetricDefinition, fold_lower};
use crate::error::ExtractionError;
use std::sync::Arc;

/// The (system, usage, server) triple every record is labelled with
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerIdentity {
    system: String,
    usage: String,
    server: String,
}

impl ServerIdentity {
    pub fn new(system: &str, usage: &str, server: &str) -> Self {
        Self {
            system: fold_lower(system),
            usage: fold_lower(usage),
            server: fold_lower(server),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn usage(&self) -> &str {
        &self.usage
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Base label values in the order of [`super::metric::BASE_LABELS`]
    pub fn base_values(&self) -> Vec<String> {
        vec![
            self.system.clone(),
            self.usage.clone(),
            self.server.clone(),
        ]
    }
}

/// One sample: label names, the same number of label values, and a value
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    label_names: Vec<String>,
    label_values: Vec<String>,
    value: f64,
}

impl MetricRecord {
    /// Create a record
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::LabelMismatch`] when the name and value lists differ
    /// in length.
    pub fn new(
        label_names: Vec<String>,
        label_values: Vec<String>,
        value: f64,
    ) -> Result<Self, ExtractionError> {
        if label_names.len() != label_values.len() {
            return Err(ExtractionError::LabelMismatch {
                labels: label_names.len(),
                values: label_values.len(),
            });
        }
        Ok(Self {
            label_names,
            label_values,
            value,
        })
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Look up a label value by name
    pub fn label(&self, name: &str) -> Option<&str> {
        self.label_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.label_values[i].as_str())
    }
}

/// All records collected for one metric in one scrape
#[derive(Debug, Clone)]
pub struct MetricSamples {
    pub metric: Arc<MetricDefinition>,
    pub records: Vec<MetricRecord>,
}

/// Everything one scrape collected
///
/// Built fresh for every scrape and never cached.
#[derive(Debug, Clone, Default)]
pub struct CollectionSnapshot {
    pub samples: Vec<MetricSamples>,
    /// False when the scrape deadline cut collection short
    pub complete: bool,
}

impl CollectionSnapshot {
    /// Total number of records across all metrics
    pub fn record_count(&self) -> usize {
        self.samples.iter().map(|s| s.records.len()).sum()
    }

    /// Records of the metric called `name`, if it produced any entry
    pub fn records_for(&self, name: &str) -> Option<&[MetricRecord]> {
        self.samples
            .iter()
            .find(|s| s.metric.name() == name)
            .map(|s| s.records.as_slice())
    }
}
