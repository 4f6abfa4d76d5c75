//! Configuration management for the exporter
//!
//! Parses TOML configuration files and provides typed access to settings. The file
//! carries the HTTP server settings, the RFC gateway, the monitored systems, the metric
//! definitions partitioned by extraction kind and the encrypted `[secret]` table.
//!
//! Raw metric and system entries are kept exactly as written; the validated, normalized
//! forms live in [`crate::models`] and are built by [`crate::models::Catalog::from_config`].

use crate::error::{AppError, AppResult};
use crate::models::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

/// Upper bound for the scrape timeout in seconds
pub const MAX_TIMEOUT_SECONDS: u64 = 300;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub systems: Vec<SystemConfig>,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Base64 encoded secret entries: `secretkey` plus one entry per system name
    #[serde(default)]
    pub secret: BTreeMap<String, String>,
}

/// HTTP server and scrape settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Scrape deadline in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Optional ceiling on simultaneous connects and function calls
    ///
    /// Absent means unbounded fan-out.
    #[serde(default)]
    pub max_in_flight_calls: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            max_in_flight_calls: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9663
}

fn default_timeout() -> u64 {
    5
}

/// RFC gateway settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub base_url: String,
    #[serde(default = "default_gateway_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_gateway_timeout() -> u64 {
    30
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One monitored system as written in the config file
///
/// Every field defaults to empty so that missing mandatory fields are reported by
/// validation with the system name, instead of a bare serde error.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SystemConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub usage: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub client: String,
    /// Application server host of the primary connection
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub sysnr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mshost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msserv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saprouter: Option<String>,
}

/// Metric definitions partitioned by extraction kind
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub table: Vec<MetricConfig>,
    #[serde(default)]
    pub field: Vec<MetricConfig>,
    #[serde(default)]
    pub structure: Vec<MetricConfig>,
}

/// One metric entry as written in the config file
///
/// All extraction settings are optional at this level. Exactly one extraction spec
/// must be complete, and it must match the section the entry was declared in.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub help: String,
    #[serde(default)]
    pub metric_type: String,
    #[serde(default)]
    pub tag_filter: Vec<String>,
    #[serde(default)]
    pub all_servers: bool,
    #[serde(default)]
    pub function_module: String,
    #[serde(default)]
    pub params: BTreeMap<String, toml::Value>,

    // table extraction
    #[serde(default)]
    pub table: String,
    #[serde(default)]
    pub row_count: BTreeMap<String, Vec<toml::Value>>,
    #[serde(default)]
    pub row_filter: BTreeMap<String, Vec<toml::Value>>,

    // field extraction
    #[serde(default)]
    pub field_labels: Vec<String>,
    #[serde(default)]
    pub field_values: Vec<String>,

    // structure extraction
    #[serde(default)]
    pub export_structure: String,
    #[serde(default)]
    pub structure_fields: Vec<String>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        // Phase 1: Read file (preserves io::Error context)
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;

        // Phase 2: Parse TOML (preserves toml::de::Error context)
        let config: Self = toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
            path: path_display.clone(),
            source,
        })?;

        // Phase 3: Validate parsed config (provides contextual reason)
        config
            .validate()
            .map_err(|e| AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Apply command-line overrides for the scrape timeout and listen port
    ///
    /// The result is validated again since the timeout bounds apply to both sources.
    pub fn with_overrides(mut self, timeout_seconds: Option<u64>, port: Option<u16>) -> AppResult<Self> {
        if let Some(timeout) = timeout_seconds {
            self.server.timeout_seconds = timeout;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self.validate()?;
        Ok(self)
    }

    /// Scrape deadline as a duration
    pub fn scrape_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.timeout_seconds)
    }

    /// Read and write timeout for the HTTP layer
    ///
    /// Two seconds longer than the scrape deadline so a partial snapshot can still be
    /// encoded and written after collection gives up.
    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.server.timeout_seconds + 2)
    }

    /// Validate configuration after parsing
    ///
    /// This is called automatically by `from_file()`, but can also be called
    /// explicitly when constructing Config via other means (e.g., in tests).
    pub fn validate(&self) -> AppResult<()> {
        if self.server.timeout_seconds == 0 {
            return Err(AppError::Config(
                "server.timeout_seconds must be greater than 0".to_string(),
            ));
        }
        if self.server.timeout_seconds > MAX_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "server.timeout_seconds cannot exceed {} seconds, got {}",
                MAX_TIMEOUT_SECONDS, self.server.timeout_seconds
            )));
        }
        if self.server.max_in_flight_calls == Some(0) {
            return Err(AppError::Config(
                "server.max_in_flight_calls must be greater than 0 when set".to_string(),
            ));
        }

        if !self.gateway.base_url.starts_with("http://")
            && !self.gateway.base_url.starts_with("https://")
        {
            return Err(AppError::Config(format!(
                "gateway.base_url '{}' must start with 'http://' or 'https://'",
                self.gateway.base_url
            )));
        }
        if self.gateway.request_timeout_seconds == 0 {
            return Err(AppError::Config(
                "gateway.request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Systems and metrics are validated by building the catalog once
        Catalog::from_config(self)?;

        Ok(())
    }

    /// Write the `[secret]` table back into the config file at `path`
    ///
    /// The file is re-read and only the `secret` key is replaced, so settings edited
    /// since startup are not lost. Comments are not preserved.
    pub fn persist_secret<P: AsRef<Path>>(
        path: P,
        secret: &BTreeMap<String, String>,
    ) -> AppResult<()> {
        let path_display = path.as_ref().display().to_string();

        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            })?;
        let mut document: toml::Table =
            toml::from_str(&content).map_err(|source| AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            })?;

        let secret_table: toml::Table = secret
            .iter()
            .map(|(name, value)| (name.clone(), toml::Value::String(value.clone())))
            .collect();
        document.insert("secret".to_string(), toml::Value::Table(secret_table));

        let rendered =
            toml::to_string_pretty(&document).map_err(|e| AppError::ConfigWriteFailed {
                path: path_display.clone(),
                reason: e.to_string(),
            })?;
        std::fs::write(path.as_ref(), rendered).map_err(|e| AppError::ConfigWriteFailed {
            path: path_display,
            reason: e.to_string(),
        })?;

        tracing::debug!(
            path = %path.as_ref().display(),
            entries = secret.len(),
            "Secret table written to config file"
        );
        Ok(())
    }
}

impl FromStr for Config {
    type Err = AppError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        let config: Config =
            toml::from_str(toml_str).map_err(|source| AppError::ConfigParseFailed {
                path: "<string>".to_string(),
                source,
            })?;

        // Validate config before returning
        config.validate()?;
        Ok(config)
    }
}
