//! Result extraction: turn a raw function result into metric records
//!
//! One dispatch over [`ExtractionSpec`]. Structural problems (a missing table, field or
//! structure) fail the whole call with an [`ExtractionError`]; a value that cannot be
//! coerced to a number only drops that value and is reported in [`Extracted::skipped`].

use crate::error::{CoercionError, ExtractionError};
use crate::models::metric::{BASE_LABELS, RowCount, RowFilter, TOTAL_FRAGMENT};
use crate::models::{
    ExtractionSpec, FieldSpec, MetricRecord, ServerIdentity, StructureSpec, TableSpec,
    fold_lower, fold_upper,
};
use crate::rfc::NestedResult;
use serde_json::{Map, Value};

/// Records of one call plus the values that were skipped
#[derive(Debug, Default)]
pub struct Extracted {
    pub records: Vec<MetricRecord>,
    pub skipped: Vec<CoercionError>,
}

/// Extract the records `spec` describes from one function result
pub fn extract(
    spec: &ExtractionSpec,
    raw: &NestedResult,
    identity: &ServerIdentity,
) -> Result<Extracted, ExtractionError> {
    match spec {
        ExtractionSpec::Table(table) => extract_table(table, raw, identity),
        ExtractionSpec::Field(FieldSpec::Labels(fields)) => {
            extract_field_labels(fields, raw, identity)
        }
        ExtractionSpec::Field(FieldSpec::Values(fields)) => {
            extract_field_values(fields, raw, identity)
        }
        ExtractionSpec::Structure(structure) => extract_structure(structure, raw, identity),
    }
}

/// Coerce a result value to a sample value
///
/// Numbers pass through; strings must parse as a float once surrounding blanks are
/// removed. Anything else fails.
pub fn coerce(field: &str, value: &Value) -> Result<f64, CoercionError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| CoercionError {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Text form of a scalar used for matching and labels; other values yield `None`
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Look up a result member; names on the remote side are upper case
///
/// A `null` member counts as missing.
fn member<'a>(object: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    let upper = fold_upper(name);
    object
        .get(&upper)
        .or_else(|| {
            object
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(&upper))
                .map(|(_, value)| value)
        })
        .filter(|value| !value.is_null())
}

fn labels_with(extra: &[&str]) -> Vec<String> {
    BASE_LABELS
        .iter()
        .chain(extra.iter())
        .map(|l| l.to_string())
        .collect()
}

fn values_with(identity: &ServerIdentity, extra: String) -> Vec<String> {
    let mut values = identity.base_values();
    values.push(extra);
    values
}

fn row_matches(row: &Map<String, Value>, filters: &[RowFilter]) -> bool {
    filters.is_empty()
        || filters.iter().any(|filter| {
            member(row, filter.field())
                .and_then(scalar_text)
                .is_some_and(|value| {
                    filter
                        .accepted()
                        .iter()
                        .any(|accepted| accepted.eq_ignore_ascii_case(&value))
                })
        })
}

/// Which fragments of `count` this row falls into
fn bucket_hits(row: &Map<String, Value>, count: &RowCount) -> Vec<bool> {
    let value = member(row, count.field())
        .and_then(scalar_text)
        .map(|v| v.to_lowercase())
        .unwrap_or_default();
    count
        .fragments()
        .iter()
        .map(|fragment| fragment == TOTAL_FRAGMENT || value.starts_with(fragment.as_str()))
        .collect()
}

fn extract_table(
    spec: &TableSpec,
    raw: &NestedResult,
    identity: &ServerIdentity,
) -> Result<Extracted, ExtractionError> {
    let rows = member(raw, spec.table())
        .ok_or_else(|| ExtractionError::MissingTable {
            table: spec.table().to_string(),
        })?
        .as_array()
        .ok_or_else(|| ExtractionError::NotATable {
            table: spec.table().to_string(),
        })?;

    let mut buckets: Vec<Vec<u64>> = spec
        .row_count()
        .iter()
        .map(|count| vec![0; count.fragments().len()])
        .collect();

    for row in rows {
        let row = row.as_object().ok_or_else(|| ExtractionError::NotATable {
            table: spec.table().to_string(),
        })?;
        if !row_matches(row, spec.row_filter()) {
            continue;
        }
        for (count, bucket) in spec.row_count().iter().zip(buckets.iter_mut()) {
            for (hit, slot) in bucket_hits(row, count).into_iter().zip(bucket.iter_mut()) {
                if hit {
                    *slot += 1;
                }
            }
        }
    }

    let labels = labels_with(&["count"]);
    let mut records = Vec::new();
    for (count, bucket) in spec.row_count().iter().zip(buckets) {
        for (fragment, total) in count.fragments().iter().zip(bucket) {
            records.push(MetricRecord::new(
                labels.clone(),
                values_with(identity, format!("{}_{}", count.field(), fragment)),
                total as f64,
            )?);
        }
    }

    Ok(Extracted {
        records,
        skipped: Vec::new(),
    })
}

fn extract_field_labels(
    fields: &[String],
    raw: &NestedResult,
    identity: &ServerIdentity,
) -> Result<Extracted, ExtractionError> {
    let mut labels = labels_with(&[]);
    let mut values = identity.base_values();

    for field in fields {
        let value = member(raw, field).ok_or_else(|| ExtractionError::MissingField {
            field: field.clone(),
        })?;
        let text = scalar_text(value).ok_or_else(|| ExtractionError::InvalidLabelValue {
            field: field.clone(),
        })?;
        labels.push(fold_lower(field));
        values.push(text.to_lowercase());
    }

    Ok(Extracted {
        records: vec![MetricRecord::new(labels, values, 1.0)?],
        skipped: Vec::new(),
    })
}

fn extract_field_values(
    fields: &[String],
    raw: &NestedResult,
    identity: &ServerIdentity,
) -> Result<Extracted, ExtractionError> {
    numeric_members(fields, raw, identity, |field| ExtractionError::MissingField {
        field: field.to_string(),
    })
}

fn extract_structure(
    spec: &StructureSpec,
    raw: &NestedResult,
    identity: &ServerIdentity,
) -> Result<Extracted, ExtractionError> {
    let structure = member(raw, spec.structure())
        .ok_or_else(|| ExtractionError::MissingStructure {
            structure: spec.structure().to_string(),
        })?
        .as_object()
        .ok_or_else(|| ExtractionError::NotAStructure {
            structure: spec.structure().to_string(),
        })?;

    numeric_members(spec.fields(), structure, identity, |field| {
        ExtractionError::MissingStructureField {
            structure: spec.structure().to_string(),
            field: field.to_string(),
        }
    })
}

/// One record per field, labelled `field=<name>`
///
/// A missing field fails the call; a non-numeric one is skipped.
fn numeric_members(
    fields: &[String],
    object: &Map<String, Value>,
    identity: &ServerIdentity,
    missing: impl Fn(&str) -> ExtractionError,
) -> Result<Extracted, ExtractionError> {
    let labels = labels_with(&["field"]);
    let mut extracted = Extracted::default();

    for field in fields {
        let value = member(object, field).ok_or_else(|| missing(field))?;
        match coerce(field, value) {
            Ok(number) => extracted.records.push(MetricRecord::new(
                labels.clone(),
                values_with(identity, fold_lower(field)),
                number,
            )?),
            Err(e) => extracted.skipped.push(e),
        }
    }

    Ok(extracted)
}
