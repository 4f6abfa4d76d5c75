//! Error types for the exporter
//!
//! `AppError` covers process-level failures (configuration, startup, HTTP surface) and
//! implements `IntoResponse` for Axum handlers. The remaining enums describe failures that
//! stay local to one branch of the collection fan-out: they are logged and counted where
//! they happen and never abort a scrape.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read config file {path}: {source}")]
    ConfigFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidationFailed { path: String, reason: String },

    #[error("Failed to write config file {path}: {reason}")]
    ConfigWriteFailed { path: String, reason: String },

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("Metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::ConfigFileRead { .. }
            | Self::ConfigParseFailed { .. }
            | Self::ConfigValidationFailed { .. }
            | Self::ConfigWriteFailed { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            Self::Secret(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::Metrics(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results
pub type AppResult<T> = Result<T, AppError>;

/// Credential lookup or decryption failure
///
/// A system whose credential cannot be resolved is excluded from collection; other
/// systems proceed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("no password stored for system '{system}'")]
    MissingCredential { system: String },

    #[error("installation secret key is missing from the [secret] table")]
    MissingKey,

    #[error("secret key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("secret entry for '{entry}' is not valid base64")]
    Encoding { entry: String },

    #[error("decryption failed: wrong key or corrupted ciphertext")]
    Decryption,

    #[error("encryption failed")]
    Encryption,

    #[error("decrypted password is not valid UTF-8")]
    NotUtf8,

    #[error("system '{system}' is not configured")]
    UnknownSystem { system: String },
}

/// A session could not be opened
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot connect to system '{system}' via server '{server}': {reason}")]
pub struct ConnectionError {
    pub system: String,
    pub server: String,
    pub reason: String,
}

/// A remote function invocation failed (transport or remote-side error)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("call of function '{function}' failed: {reason}")]
pub struct CallError {
    pub function: String,
    pub reason: String,
}

/// The remote result does not have the shape a metric expects
///
/// Any extraction error discards every record of the call it occurred in.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("table '{table}' is missing from the function result")]
    MissingTable { table: String },

    #[error("'{table}' is not a table of structures")]
    NotATable { table: String },

    #[error("field '{field}' is missing from the function result")]
    MissingField { field: String },

    #[error("field '{field}' cannot be used as a label value")]
    InvalidLabelValue { field: String },

    #[error("export structure '{structure}' is missing from the function result")]
    MissingStructure { structure: String },

    #[error("'{structure}' is not a structure")]
    NotAStructure { structure: String },

    #[error("field '{field}' is missing from structure '{structure}'")]
    MissingStructureField { structure: String, field: String },

    #[error("record has {labels} label names but {values} label values")]
    LabelMismatch { labels: usize, values: usize },
}

/// A single field could not be turned into a sample value
///
/// Only the offending field is skipped; sibling fields of the same call are kept.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("field '{field}' has non-numeric value {value}")]
pub struct CoercionError {
    pub field: String,
    pub value: String,
}

/// Server resolution failed; the system contributes no records for this metric
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error(transparent)]
    Credential(#[from] SecretError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("server list lookup failed: {0}")]
    Topology(#[from] CallError),

    #[error("scrape deadline expired before the system was contacted")]
    DeadlineExpired,

    #[error("no application server could be connected")]
    NoServers,
}
