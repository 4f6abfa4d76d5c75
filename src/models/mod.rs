//! Domain model: validated metric definitions, systems and metric records
//!
//! Everything in here is built once from [`crate::config::Config`] at startup and is
//! read-only while collection runs.

pub mod catalog;
pub mod metric;
pub mod record;
pub mod system;

pub use catalog::Catalog;
pub use metric::{
    CallParams, ExtractionKind, ExtractionSpec, FieldSpec, MetricDefinition, MetricType,
    StructureSpec, TableSpec,
};
pub use record::{CollectionSnapshot, MetricRecord, MetricSamples, ServerIdentity};
pub use system::SystemDefinition;

/// Trim and lower-case a name used for labels and lookups on our side
pub(crate) fn fold_lower(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Trim and upper-case a name used on the remote interface
///
/// Function modules, tables, structures, fields and parameter keys are all upper case
/// on the remote side.
pub(crate) fn fold_upper(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Check a Prometheus metric name: `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub(crate) fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Check a Prometheus label name: `[a-zA-Z_][a-zA-Z0-9_]*`, no reserved `__` prefix
pub(crate) fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
