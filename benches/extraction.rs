//! Extraction and exposition benchmarks
//!
//! Measures the CPU-bound parts of a scrape (excludes remote calls): counting table
//! rows into buckets, coercing values, and rendering a snapshot in text format.
//!
//! Run with: `cargo bench`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nwrfc_exporter::collector::{coerce, extract};
use nwrfc_exporter::exposition;
use nwrfc_exporter::metrics::Metrics;
use nwrfc_exporter::models::{
    CollectionSnapshot, ExtractionSpec, MetricDefinition, MetricSamples, MetricType,
    ServerIdentity, TableSpec,
};
use nwrfc_exporter::rfc::NestedResult;
use serde_json::{Value, json};
use std::hint::black_box;
use std::sync::Arc;

const TYPES: [&str; 5] = ["DIA", "BTC", "UPD", "SPO", "ENQ"];

fn wplist(rows: usize) -> NestedResult {
    let rows: Vec<Value> = (0..rows)
        .map(|i| json!({ "WP_TYP": TYPES[i % TYPES.len()], "WP_ISTATUS": (i % 4) as i64 }))
        .collect();
    match json!({ "WPLIST": rows }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

fn table_spec() -> ExtractionSpec {
    ExtractionSpec::Table(
        TableSpec::new(
            "WPLIST",
            vec![("WP_TYP", vec!["dia", "btc", "upd", "spo", "total"])],
        )
        .with_row_filter(vec![("WP_ISTATUS", vec!["1", "2"])]),
    )
}

/// Benchmark table extraction for growing result tables
fn bench_table_extraction(c: &mut Criterion) {
    let spec = table_spec();
    let identity = ServerIdentity::new("d01", "development", "sapd01");
    let mut group = c.benchmark_group("table_extraction");

    for rows in [10usize, 100, 1_000, 10_000] {
        let raw = wplist(rows);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &raw, |b, raw| {
            b.iter(|| extract(black_box(&spec), black_box(raw), &identity))
        });
    }

    group.finish();
}

/// Benchmark value coercion for numbers and numeric strings
fn bench_coercion(c: &mut Criterion) {
    let cases = [
        ("integer", json!(42)),
        ("float", json!(99.5)),
        ("padded_string", json!("  1234.5 ")),
        ("invalid_string", json!("n/a")),
    ];
    let mut group = c.benchmark_group("coercion");

    for (name, value) in cases {
        group.bench_with_input(BenchmarkId::from_parameter(name), &value, |b, value| {
            b.iter(|| coerce("FIELD", black_box(value)))
        });
    }

    group.finish();
}

/// Benchmark rendering a snapshot of many servers in text format
fn bench_render(c: &mut Criterion) {
    let metric = Arc::new(
        MetricDefinition::new(
            "sap_processes",
            "Work processes by type",
            MetricType::Gauge,
            "TH_WPINFO",
            table_spec(),
        )
        .expect("valid metric"),
    );
    let raw = wplist(100);
    let records = (0..50)
        .flat_map(|i| {
            let identity = ServerIdentity::new("d01", "development", &format!("sapd{:02}", i));
            extract(metric.spec(), &raw, &identity)
                .expect("table present")
                .records
        })
        .collect();
    let snapshot = CollectionSnapshot {
        samples: vec![MetricSamples { metric, records }],
        complete: true,
    };
    let self_metrics = Metrics::new().expect("self metrics register");

    c.bench_function("render_50_servers", |b| {
        b.iter(|| exposition::render(black_box(&snapshot), &self_metrics))
    });
}

criterion_group!(
    benches,
    bench_table_extraction,
    bench_coercion,
    bench_render
);
criterion_main!(benches);
