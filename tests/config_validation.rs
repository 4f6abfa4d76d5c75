//! Integration tests for configuration validation
//!
//! Verifies that invalid configurations are rejected at startup (Config::from_file())
//! rather than causing runtime errors. Tests the full path: file → parse → validate.

use nwrfc_exporter::config::Config;
use nwrfc_exporter::models::{Catalog, ExtractionKind, MetricType};
use std::io::Write;
use tempfile::NamedTempFile;

/// Helper to create a temporary config file with given TOML content
fn create_temp_config(toml_content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(toml_content.as_bytes())
        .expect("Failed to write temp file");
    temp_file.flush().expect("Failed to flush temp file");
    temp_file
}

const BASE: &str = r#"
[gateway]
base_url = "http://localhost:8090"

[[systems]]
name = "D01"
usage = "development"
tags = ["erp"]
user = "monitor"
lang = "en"
client = "100"
server = "sapd01"
sysnr = "00"
"#;

fn with_base(extra: &str) -> String {
    format!("{}\n{}", BASE, extra)
}

fn rejection(toml_content: &str) -> String {
    let temp_file = create_temp_config(toml_content);
    match Config::from_file(temp_file.path()) {
        Ok(_) => panic!("config should be rejected"),
        Err(e) => e.to_string(),
    }
}

#[test]
fn test_valid_config_builds_catalog() {
    let temp_file = create_temp_config(&with_base(
        r#"
[[metrics.table]]
name = "SAP_Processes"
help = "Work processes"
metric_type = "Gauge"
function_module = "th_wpinfo"
all_servers = true
table = "wplist"
row_count = { wp_typ = ["DIA", "total"] }
row_filter = { wp_istatus = [2, "running"] }
params = { SRVNAME = "", with_cpu = 1 }
"#,
    ));

    let config = Config::from_file(temp_file.path()).expect("config should load");
    let catalog = Catalog::from_config(&config).unwrap();

    let metric = &catalog.metrics()[0];
    assert_eq!(metric.name(), "sap_processes");
    assert_eq!(metric.metric_type(), MetricType::Gauge);
    assert_eq!(metric.function(), "TH_WPINFO");
    assert!(metric.all_servers());
    assert_eq!(metric.spec().kind(), ExtractionKind::Table);
    assert!(metric.params().contains_key("SRVNAME"));
    assert!(metric.params().contains_key("WITH_CPU"));

    let system = &catalog.systems()[0];
    assert_eq!(system.name(), "d01");
    assert_eq!(system.lang(), "EN");
}

#[test]
fn test_rejects_metric_without_extraction_spec() {
    let msg = rejection(&with_base(
        r#"
[[metrics.table]]
name = "sap_processes"
help = "Work processes"
metric_type = "gauge"
function_module = "TH_WPINFO"
"#,
    ));
    assert!(msg.contains("sap_processes"), "got: {}", msg);
    assert!(msg.contains("missing extraction spec"), "got: {}", msg);
}

#[test]
fn test_rejects_metric_with_two_extraction_specs() {
    let msg = rejection(&with_base(
        r#"
[[metrics.table]]
name = "sap_mixed"
help = "Mixed"
metric_type = "gauge"
function_module = "TH_WPINFO"
table = "WPLIST"
row_count = { wp_typ = ["dia"] }
field_values = ["WP_COUNT"]
"#,
    ));
    assert!(msg.contains("exactly one"), "got: {}", msg);
}

#[test]
fn test_rejects_spec_declared_in_wrong_section() {
    let msg = rejection(&with_base(
        r#"
[[metrics.structure]]
name = "sap_kernel"
help = "Kernel"
metric_type = "gauge"
function_module = "TH_SAPREL4"
field_labels = ["KERN_REL"]
"#,
    ));
    assert!(msg.contains("[[metrics.structure]]"), "got: {}", msg);
}

#[test]
fn test_rejects_unknown_metric_type() {
    let msg = rejection(&with_base(
        r#"
[[metrics.field]]
name = "sap_kernel"
help = "Kernel"
metric_type = "histogram"
function_module = "TH_SAPREL4"
field_labels = ["KERN_REL"]
"#,
    ));
    assert!(msg.contains("metric_type"), "got: {}", msg);
}

#[test]
fn test_rejects_missing_mandatory_metric_fields() {
    let msg = rejection(&with_base(
        r#"
[[metrics.field]]
name = "sap_kernel"
metric_type = "gauge"
field_labels = ["KERN_REL"]
"#,
    ));
    assert!(msg.contains("help"), "got: {}", msg);
    assert!(msg.contains("function_module"), "got: {}", msg);
}

#[test]
fn test_rejects_field_label_clashing_with_base_label() {
    let msg = rejection(&with_base(
        r#"
[[metrics.field]]
name = "sap_kernel"
help = "Kernel"
metric_type = "gauge"
function_module = "TH_SAPREL4"
field_labels = ["SYSTEM"]
"#,
    ));
    assert!(msg.contains("system"), "got: {}", msg);
}

#[test]
fn test_rejects_metric_named_like_a_self_metric() {
    let msg = rejection(&with_base(
        r#"
[[metrics.field]]
name = "nwrfc_exporter_records_total"
help = "Shadows the exporter's own counter"
metric_type = "counter"
function_module = "TH_SAPREL4"
field_values = ["KERN_PATCHLEVEL"]
"#,
    ));
    assert!(msg.contains("reserved"), "got: {}", msg);
}

#[test]
fn test_rejects_duplicate_metric_names() {
    let metric = r#"
[[metrics.field]]
name = "sap_kernel"
help = "Kernel"
metric_type = "gauge"
function_module = "TH_SAPREL4"
field_labels = ["KERN_REL"]
"#;
    let msg = rejection(&with_base(&format!("{}{}", metric, metric)));
    assert!(msg.contains("defined more than once"), "got: {}", msg);
}

#[test]
fn test_rejects_system_missing_mandatory_fields() {
    let msg = rejection(
        r#"
[gateway]
base_url = "http://localhost:8090"

[[systems]]
name = "Q01"
usage = "quality"
lang = "en"
server = "sapq01"
"#,
    );
    assert!(msg.contains("q01"), "got: {}", msg);
    assert!(msg.contains("user"), "got: {}", msg);
    assert!(msg.contains("client"), "got: {}", msg);
    assert!(msg.contains("sysnr"), "got: {}", msg);
}

#[test]
fn test_rejects_zero_timeout() {
    let msg = rejection(&format!("[server]\ntimeout_seconds = 0\n{}", BASE));
    assert!(msg.contains("timeout_seconds"), "got: {}", msg);
}

#[test]
fn test_rejects_gateway_url_without_scheme() {
    let msg = rejection(
        r#"
[gateway]
base_url = "localhost:8090"
"#,
    );
    assert!(msg.contains("base_url"), "got: {}", msg);
}

#[test]
fn test_overrides_are_validated() {
    let temp_file = create_temp_config(BASE);
    let config = Config::from_file(temp_file.path()).unwrap();

    let overridden = config.clone().with_overrides(Some(10), Some(9000)).unwrap();
    assert_eq!(overridden.server.timeout_seconds, 10);
    assert_eq!(overridden.server.port, 9000);

    assert!(config.with_overrides(Some(0), None).is_err());
}

#[test]
fn test_missing_file_names_path() {
    let err = Config::from_file("/nonexistent/nwrfc_exporter.toml").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/nwrfc_exporter.toml"));
}
