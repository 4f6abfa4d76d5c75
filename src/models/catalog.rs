//! The validated set of metrics and systems

use super::{ExtractionKind, MetricDefinition, SystemDefinition};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Immutable metric catalog plus the systems to collect from
///
/// Shared read-only by every collection task.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    metrics: Vec<Arc<MetricDefinition>>,
    systems: Vec<Arc<SystemDefinition>>,
}

impl Catalog {
    /// Build the catalog from a parsed config, validating every entry
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let sections = [
            (ExtractionKind::Table, &config.metrics.table),
            (ExtractionKind::Field, &config.metrics.field),
            (ExtractionKind::Structure, &config.metrics.structure),
        ];

        let mut metrics = Vec::new();
        for (kind, entries) in sections {
            for entry in entries {
                metrics.push(MetricDefinition::from_config(entry, kind)?);
            }
        }

        let systems = config
            .systems
            .iter()
            .map(SystemDefinition::from_config)
            .collect::<AppResult<Vec<_>>>()?;

        Self::new(metrics, systems)
    }

    /// Assemble a catalog, rejecting duplicate metric or system names
    pub fn new(metrics: Vec<MetricDefinition>, systems: Vec<SystemDefinition>) -> AppResult<Self> {
        let mut seen = HashSet::new();
        for metric in &metrics {
            if !seen.insert(metric.name()) {
                return Err(AppError::Config(format!(
                    "metric '{}' is defined more than once",
                    metric.name()
                )));
            }
        }

        let mut seen = HashSet::new();
        for system in &systems {
            if !seen.insert(system.name()) {
                return Err(AppError::Config(format!(
                    "system '{}' is defined more than once",
                    system.name()
                )));
            }
        }

        Ok(Self {
            metrics: metrics.into_iter().map(Arc::new).collect(),
            systems: systems.into_iter().map(Arc::new).collect(),
        })
    }

    /// Same metrics, restricted to the given systems
    ///
    /// Used to drop systems whose credential could not be resolved.
    pub fn with_systems(&self, systems: Vec<Arc<SystemDefinition>>) -> Self {
        Self {
            metrics: self.metrics.clone(),
            systems,
        }
    }

    pub fn metrics(&self) -> &[Arc<MetricDefinition>] {
        &self.metrics
    }

    pub fn systems(&self) -> &[Arc<SystemDefinition>] {
        &self.systems
    }

    pub fn system(&self, name: &str) -> Option<&Arc<SystemDefinition>> {
        self.systems.iter().find(|s| s.name() == name)
    }
}
