//! Integration tests for the scrape deadline
//!
//! Time is paused, so hung systems cost nothing and elapsed times are exact.

mod common;

use common::{ANY_HOST, FakeConnector, Reply, system};
use nwrfc_exporter::collector::{Collector, MergeLevel, ScrapeDeadline};
use nwrfc_exporter::collector::deadline::MAX_MERGE_GRACE;
use nwrfc_exporter::metrics::Metrics;
use nwrfc_exporter::models::{
    Catalog, ExtractionSpec, MetricDefinition, MetricType, SystemDefinition, TableSpec,
};
use nwrfc_exporter::rfc::Credential;
use nwrfc_exporter::secret::CredentialStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_secs(1);

fn metric(name: &str) -> MetricDefinition {
    MetricDefinition::new(
        name,
        "Work processes by type",
        MetricType::Gauge,
        "TH_WPINFO",
        ExtractionSpec::Table(TableSpec::new("WPLIST", vec![("WP_TYP", vec!["dia"])])),
    )
    .unwrap()
}

fn build(
    metrics: Vec<MetricDefinition>,
    systems: Vec<SystemDefinition>,
    connector: &FakeConnector,
) -> Collector {
    let credentials = CredentialStore::from_credentials(
        systems
            .iter()
            .map(|s| (s.name().to_string(), Credential::new("secret"))),
    );
    Collector::new(
        Arc::new(Catalog::new(metrics, systems).unwrap()),
        credentials,
        Arc::new(connector.clone()),
        TIMEOUT,
        Arc::new(Metrics::new().unwrap()),
    )
}

fn one_dia() -> serde_json::Value {
    json!({ "WPLIST": [{ "WP_TYP": "DIA" }] })
}

#[tokio::test(start_paused = true)]
async fn test_hung_call_returns_partial_results_in_time() {
    let connector = FakeConnector::new()
        .topology("d01", &[])
        .topology("p01", &[])
        .ok("d01", ANY_HOST, "TH_WPINFO", one_dia())
        .reply(
            "p01",
            ANY_HOST,
            "TH_WPINFO",
            Reply::Delay(Duration::from_secs(60), Box::new(Reply::Ok(one_dia()))),
        );
    let collector = build(
        vec![metric("sap_processes")],
        vec![system("D01", "sapd01", &[]), system("P01", "sapp01", &[])],
        &connector,
    );

    let started = Instant::now();
    let snapshot = collector.collect().await;
    let elapsed = started.elapsed();

    assert!(elapsed >= TIMEOUT);
    assert!(elapsed <= TIMEOUT + MAX_MERGE_GRACE);
    assert!(!snapshot.complete);
    let recs = snapshot.records_for("sap_processes").unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0].label("system"), Some("d01"));
}

#[tokio::test(start_paused = true)]
async fn test_hung_logon_returns_partial_results_in_time() {
    let connector = FakeConnector::new()
        .slow_open("p01", Duration::from_secs(60))
        .topology("d01", &[])
        .topology("p01", &[])
        .ok("d01", ANY_HOST, "TH_WPINFO", one_dia())
        .ok("p01", ANY_HOST, "TH_WPINFO", one_dia());
    let collector = build(
        vec![metric("sap_processes"), metric("sap_processes_again")],
        vec![system("D01", "sapd01", &[]), system("P01", "sapp01", &[])],
        &connector,
    );

    let started = Instant::now();
    let snapshot = collector.collect().await;

    assert!(started.elapsed() <= TIMEOUT + MAX_MERGE_GRACE);
    assert!(!snapshot.complete);
    assert_eq!(snapshot.record_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_late_sessions_are_still_closed() {
    let connector = FakeConnector::new()
        .topology("d01", &[])
        .reply(
            "d01",
            ANY_HOST,
            "TH_WPINFO",
            Reply::Delay(Duration::from_secs(10), Box::new(Reply::Ok(one_dia()))),
        );
    let collector = build(
        vec![metric("sap_processes")],
        vec![system("D01", "sapd01", &[])],
        &connector,
    );

    let snapshot = collector.collect().await;
    assert!(!snapshot.complete);
    assert_eq!(snapshot.record_count(), 0);

    // Let the abandoned call finish
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.opened(), 1);
    assert_eq!(connector.closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fast_scrape_does_not_wait_for_deadline() {
    let connector = FakeConnector::new()
        .topology("d01", &[])
        .ok("d01", ANY_HOST, "TH_WPINFO", one_dia());
    let collector = build(
        vec![metric("sap_processes")],
        vec![system("D01", "sapd01", &[])],
        &connector,
    );

    let started = Instant::now();
    let snapshot = collector.collect().await;

    assert!(started.elapsed() < TIMEOUT);
    assert!(snapshot.complete);
}

#[tokio::test(start_paused = true)]
async fn test_merge_cutoffs_are_ordered_inner_first() {
    let deadline = ScrapeDeadline::after(TIMEOUT);
    let servers = deadline.cutoff(MergeLevel::Servers);
    let systems = deadline.cutoff(MergeLevel::Systems);
    let metrics = deadline.cutoff(MergeLevel::Metrics);

    assert_eq!(servers, deadline.expires_at());
    assert!(servers < systems);
    assert!(systems < metrics);
    assert_eq!(metrics - servers, MAX_MERGE_GRACE);
}
