//! Per-system fan-out over resolved server sessions

use super::deadline::merge_until;
use super::{Collected, MergeLevel, ScrapeContext, extract};
use crate::metrics::Stage;
use crate::models::{MetricDefinition, MetricRecord, ServerIdentity, SystemDefinition};
use crate::rfc::ServerHandle;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Call the metric's function on every handle and merge the extracted records
///
/// Each handle moves into its own task, which closes it when done.
pub(crate) async fn collect_servers(
    ctx: &ScrapeContext,
    metric: Arc<MetricDefinition>,
    system: Arc<SystemDefinition>,
    handles: Vec<ServerHandle>,
) -> Collected {
    let (tx, rx) = mpsc::unbounded_channel();

    for handle in handles {
        let ctx = ctx.clone();
        let metric = Arc::clone(&metric);
        let system = Arc::clone(&system);
        let tx = tx.clone();
        let span = tracing::debug_span!("server", server = %handle.name());
        tokio::spawn(
            async move {
                let records = collect_server(&ctx, &metric, &system, handle).await;
                let _ = tx.send(records);
            }
            .instrument(span),
        );
    }
    drop(tx);

    let merged = merge_until(rx, ctx.deadline.cutoff(MergeLevel::Servers)).await;
    Collected {
        records: merged.items.into_iter().flatten().collect(),
        complete: merged.complete,
    }
}

async fn collect_server(
    ctx: &ScrapeContext,
    metric: &MetricDefinition,
    system: &SystemDefinition,
    mut handle: ServerHandle,
) -> Vec<MetricRecord> {
    let server = handle.name().to_string();

    let outcome = ctx
        .gate
        .run(async {
            if ctx.deadline.is_expired() {
                return None;
            }
            Some(handle.invoke(metric.function(), metric.params()).await)
        })
        .await;
    handle.close().await;

    let raw = match outcome {
        None => {
            tracing::debug!(
                system = %system.name(),
                server = %server,
                "Deadline expired before the call"
            );
            return Vec::new();
        }
        Some(Err(e)) => {
            ctx.metrics.branch_failure(Stage::Call);
            tracing::warn!(
                system = %system.name(),
                server = %server,
                function = %metric.function(),
                error = %e,
                "Function call failed"
            );
            return Vec::new();
        }
        Some(Ok(raw)) => raw,
    };

    let identity = ServerIdentity::new(system.name(), system.usage(), &server);
    match extract(metric.spec(), &raw, &identity) {
        Ok(extracted) => {
            for skipped in &extracted.skipped {
                ctx.metrics.branch_failure(Stage::Coercion);
                tracing::warn!(
                    system = %system.name(),
                    server = %server,
                    metric = %metric.name(),
                    field = %skipped.field,
                    error = %skipped,
                    "Skipping non-numeric value"
                );
            }
            extracted.records
        }
        Err(e) => {
            ctx.metrics.branch_failure(Stage::Extraction);
            tracing::error!(
                system = %system.name(),
                server = %server,
                metric = %metric.name(),
                function = %metric.function(),
                error = %e,
                "Result does not match the metric definition"
            );
            Vec::new()
        }
    }
}
