//! Command-line interface for the exporter
//!
//! Provides argument parsing and subcommand handling for the `nwrfc_exporter` binary.

use clap::{Parser, Subcommand};

/// Prometheus exporter for SAP NetWeaver systems
#[derive(Parser)]
#[command(name = "nwrfc_exporter")]
#[command(version)]
#[command(about = "Prometheus exporter for SAP NetWeaver ABAP systems")]
#[command(
    long_about = "nwrfc_exporter calls remote-enabled function modules on the configured \
    systems on every scrape and exposes the results as Prometheus metrics."
)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "nwrfc_exporter.toml", global = true)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the exporter (default when no subcommand is given)
    Web {
        /// Scrape timeout in seconds, overrides server.timeout_seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Listen port, overrides server.port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Store an encrypted password for one or more systems (read from stdin)
    Pw {
        /// Comma-separated system names
        #[arg(short, long = "system", value_delimiter = ',', required = true)]
        systems: Vec<String>,
    },
    /// Generate a template configuration file
    Config {
        /// Output file path (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Generate template configuration content
pub fn generate_config_template() -> &'static str {
    r#"# nwrfc_exporter Configuration
# ============================
#
# HTTP server, RFC gateway, monitored systems and metric definitions.
# Passwords are added encrypted by `nwrfc_exporter pw`, never by hand.

# ─────────────────────────────────────────────────────────────────────────────
# SERVER CONFIGURATION
# ─────────────────────────────────────────────────────────────────────────────

[server]
# IP address to bind to (0.0.0.0 for all interfaces, 127.0.0.1 for localhost only)
host = "0.0.0.0"

# Port to listen on
port = 9663

# Scrape deadline in seconds; partial results are returned when it expires
timeout_seconds = 5

# Optional ceiling on simultaneous connects and function calls
# max_in_flight_calls = 32

# ─────────────────────────────────────────────────────────────────────────────
# RFC GATEWAY
# ─────────────────────────────────────────────────────────────────────────────

[gateway]
# Base URL of the RFC gateway that holds the SAP sessions
base_url = "http://localhost:8090"
request_timeout_seconds = 30

# ─────────────────────────────────────────────────────────────────────────────
# OBSERVABILITY
# ─────────────────────────────────────────────────────────────────────────────

[observability]
# Log level: "trace", "debug", "info", "warn", "error"
log_level = "info"

# ─────────────────────────────────────────────────────────────────────────────
# SYSTEMS
# ─────────────────────────────────────────────────────────────────────────────
#
# Mandatory: name, usage, user, lang, client, server, sysnr
# Optional: tags, mshost, msserv, group, saprouter

[[systems]]
name = "D01"
usage = "development"
tags = ["erp"]
user = "monitor"
lang = "en"
client = "100"
server = "sapd01"
sysnr = "00"

# ─────────────────────────────────────────────────────────────────────────────
# METRICS
# ─────────────────────────────────────────────────────────────────────────────
#
# Each metric is declared under the section of its extraction kind:
#   [[metrics.table]]      count rows of a result table per field value
#   [[metrics.field]]      export top-level fields as labels or values
#   [[metrics.structure]]  export numeric members of a result structure
#
# Common fields: name, help, metric_type ("gauge" or "counter"), function_module,
# optional tag_filter, all_servers and params.

[[metrics.table]]
name = "sap_processes"
help = "Work processes by type"
metric_type = "gauge"
all_servers = true
function_module = "TH_WPINFO"
table = "WPLIST"
row_count = { WP_TYP = ["DIA", "BTC", "total"] }

[[metrics.field]]
name = "sap_kernel_info"
help = "Kernel release of the system"
metric_type = "gauge"
function_module = "TH_SAPREL4"
field_labels = ["KERN_REL", "KERN_PATCHLEVEL"]

[[metrics.structure]]
name = "sap_start_time"
help = "Start date and time of the application server"
metric_type = "gauge"
all_servers = true
function_module = "TH_SERVER_STARTTIME"
export_structure = "STARTTIME"
structure_fields = ["DATE", "TIME"]
"#
}
