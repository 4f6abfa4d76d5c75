//! Server resolution: which sessions a metric needs on one system

use super::ScrapeContext;
use crate::error::ResolveError;
use crate::models::{CallParams, MetricDefinition, SystemDefinition, fold_lower};
use crate::rfc::{Credential, NestedResult, ServerHandle, TOPOLOGY_FUNCTION};
use futures::future::join_all;

/// An application server listed by the topology function
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServerEntry {
    pub host: String,
    pub sysnr: String,
}

/// Open the sessions `metric` needs on `system`
///
/// The primary session is always opened and used to read the server list. It is
/// returned as-is unless the metric wants every server and there is more than one; then
/// it is closed and one session per listed server is opened concurrently. Servers that
/// cannot be reached are dropped.
pub(crate) async fn resolve_servers(
    ctx: &ScrapeContext,
    metric: &MetricDefinition,
    system: &SystemDefinition,
) -> Result<Vec<ServerHandle>, ResolveError> {
    let credential = ctx.credentials.get(system.name())?;
    if ctx.deadline.is_expired() {
        return Err(ResolveError::DeadlineExpired);
    }

    let session = ctx
        .gate
        .run(
            ctx.connector
                .open(system.logon(credential), system.coordinates()),
        )
        .await?;
    let mut primary = ServerHandle::new(system.name(), session);

    if ctx.deadline.is_expired() {
        primary.close().await;
        return Err(ResolveError::DeadlineExpired);
    }
    let params = CallParams::new();
    let topology = ctx
        .gate
        .run(primary.invoke(TOPOLOGY_FUNCTION, &params))
        .await;
    let topology = match topology {
        Ok(result) => result,
        Err(e) => {
            primary.close().await;
            return Err(e.into());
        }
    };

    let servers = parse_server_list(system.name(), &topology);
    if !metric.all_servers() || servers.len() <= 1 {
        return Ok(vec![primary]);
    }

    primary.close().await;
    tracing::debug!(
        system = %system.name(),
        servers = servers.len(),
        "Opening one session per application server"
    );

    let opens = servers
        .iter()
        .map(|server| open_server(ctx, system, credential, server));
    let handles: Vec<ServerHandle> = join_all(opens).await.into_iter().flatten().collect();

    if handles.is_empty() {
        return Err(ResolveError::NoServers);
    }
    Ok(handles)
}

async fn open_server(
    ctx: &ScrapeContext,
    system: &SystemDefinition,
    credential: &Credential,
    server: &ServerEntry,
) -> Option<ServerHandle> {
    if ctx.deadline.is_expired() {
        return None;
    }
    let coordinates = system
        .coordinates()
        .application_server(&server.host, &server.sysnr);

    match ctx
        .gate
        .run(ctx.connector.open(system.logon(credential), &coordinates))
        .await
    {
        Ok(session) => Some(ServerHandle::new(server.host.clone(), session)),
        Err(e) => {
            ctx.metrics.branch_failure(crate::metrics::Stage::Connection);
            tracing::warn!(
                system = %system.name(),
                server = %server.host,
                error = %e,
                "Cannot connect to application server"
            );
            None
        }
    }
}

/// Read the `LIST` table of the topology result
///
/// Each row's `NAME` has the form `<host>_<SID>_<sysnr>`. A missing list yields no
/// entries; malformed rows are logged and skipped.
pub(crate) fn parse_server_list(system: &str, result: &NestedResult) -> Vec<ServerEntry> {
    let Some(rows) = result.get("LIST").and_then(|list| list.as_array()) else {
        tracing::debug!(system = %system, "Server list is empty, using primary connection");
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let name = row.get("NAME").and_then(|n| n.as_str()).map(str::trim);
            let parts: Vec<&str> = name.map(|n| n.split('_').collect()).unwrap_or_default();
            match parts.as_slice() {
                [host, _sid, sysnr, ..] if !host.trim().is_empty() && !sysnr.trim().is_empty() => {
                    Some(ServerEntry {
                        host: fold_lower(host),
                        sysnr: sysnr.trim().to_string(),
                    })
                }
                _ => {
                    tracing::warn!(
                        system = %system,
                        entry = %row,
                        "Skipping malformed server list entry"
                    );
                    None
                }
            }
        })
        .collect()
}
