//! Per-metric fan-out over systems

use super::deadline::merge_until;
use super::{Collected, MergeLevel, ScrapeContext, resolver, server};
use crate::error::ResolveError;
use crate::metrics::Stage;
use crate::models::{Catalog, MetricDefinition, SystemDefinition};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Collect one metric from every system whose tags match its filter
pub(crate) async fn collect_metric(
    ctx: ScrapeContext,
    metric: Arc<MetricDefinition>,
    catalog: Arc<Catalog>,
) -> Collected {
    let (tx, rx) = mpsc::unbounded_channel();

    for system in catalog.systems() {
        if !system.has_tags(metric.tag_filter()) {
            tracing::trace!(system = %system.name(), "System skipped by tag filter");
            continue;
        }

        let ctx = ctx.clone();
        let metric = Arc::clone(&metric);
        let system = Arc::clone(system);
        let tx = tx.clone();
        let span = tracing::debug_span!("system", system = %system.name());
        tokio::spawn(
            async move {
                let _ = tx.send(collect_system(ctx, metric, system).await);
            }
            .instrument(span),
        );
    }
    drop(tx);

    let merged = merge_until(rx, ctx.deadline.cutoff(MergeLevel::Systems)).await;
    Collected::merge(merged.items, merged.complete)
}

async fn collect_system(
    ctx: ScrapeContext,
    metric: Arc<MetricDefinition>,
    system: Arc<SystemDefinition>,
) -> Collected {
    match resolver::resolve_servers(&ctx, &metric, &system).await {
        Ok(handles) => server::collect_servers(&ctx, metric, system, handles).await,
        Err(ResolveError::DeadlineExpired) => {
            tracing::debug!(
                system = %system.name(),
                "Deadline expired before the system was contacted"
            );
            Collected {
                records: Vec::new(),
                complete: false,
            }
        }
        Err(e) => {
            let stage = match &e {
                ResolveError::Credential(_) => Stage::Credential,
                ResolveError::Topology(_) => Stage::Topology,
                _ => Stage::Connection,
            };
            ctx.metrics.branch_failure(stage);
            tracing::warn!(
                system = %system.name(),
                function = %metric.function(),
                stage = stage.as_str(),
                error = %e,
                "System unavailable for this metric"
            );
            Collected::empty()
        }
    }
}
