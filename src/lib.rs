//! nwrfc_exporter - Prometheus exporter for SAP NetWeaver ABAP systems
//!
//! Every scrape calls the configured remote function modules on all matching systems,
//! optionally on every application server, extracts numeric values from the nested
//! results and renders them in Prometheus text format. A scrape is bounded by one
//! deadline and returns whatever arrived before it.

pub mod app;
pub mod cli;
pub mod collector;
pub mod commands;
pub mod config;
pub mod error;
pub mod exposition;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rfc;
pub mod secret;
pub mod telemetry;
