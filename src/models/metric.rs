//! Metric definitions and their extraction specs
//!
//! A [`MetricDefinition`] names one remote function call and exactly one way of turning
//! its result into samples. The three extraction shapes are a closed set, modelled as the
//! [`ExtractionSpec`] enum so every consumer matches over all of them.

use super::{fold_lower, fold_upper, is_valid_label_name, is_valid_metric_name};
use crate::config::MetricConfig;
use crate::error::{AppError, AppResult};
use crate::metrics::SELF_METRIC_PREFIX;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

/// Parameters passed to a remote function, keys already upper-cased
pub type CallParams = serde_json::Map<String, Value>;

/// Label names every record starts with
pub const BASE_LABELS: [&str; 3] = ["system", "usage", "server"];

/// Row-count fragment that matches every row passing the row filter
pub const TOTAL_FRAGMENT: &str = "total";

/// Prometheus value type used for all records of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

impl FromStr for MetricType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("gauge") {
            Ok(MetricType::Gauge)
        } else if value.eq_ignore_ascii_case("counter") {
            Ok(MetricType::Counter)
        } else {
            Err(AppError::Config(format!(
                "metric_type must be 'gauge' or 'counter', got '{}'",
                value
            )))
        }
    }
}

/// Which config section a metric was declared in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionKind {
    Table,
    Field,
    Structure,
}

impl ExtractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionKind::Table => "table",
            ExtractionKind::Field => "field",
            ExtractionKind::Structure => "structure",
        }
    }
}

/// Count rows whose `field` starts with one of `fragments`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCount {
    field: String,
    fragments: Vec<String>,
}

impl RowCount {
    /// Result field name (lower case)
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Lower-cased prefixes, possibly including [`TOTAL_FRAGMENT`]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }
}

/// Accept rows whose `field` equals one of `accepted` (case-insensitive)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFilter {
    field: String,
    accepted: Vec<String>,
}

impl RowFilter {
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }
}

/// Bucket-count the rows of a result table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    table: String,
    row_count: Vec<RowCount>,
    row_filter: Vec<RowFilter>,
}

impl TableSpec {
    /// Create a table spec; names are normalized, fragments lower-cased
    pub fn new<F, S>(table: &str, row_count: impl IntoIterator<Item = (F, Vec<S>)>) -> Self
    where
        F: AsRef<str>,
        S: AsRef<str>,
    {
        Self {
            table: fold_upper(table),
            row_count: row_count
                .into_iter()
                .map(|(field, fragments)| RowCount {
                    field: fold_lower(field.as_ref()),
                    fragments: fragments.iter().map(|f| fold_lower(f.as_ref())).collect(),
                })
                .collect(),
            row_filter: Vec::new(),
        }
    }

    /// Restrict counting to rows matching any of the given field/value pairs
    pub fn with_row_filter<F, S>(mut self, row_filter: impl IntoIterator<Item = (F, Vec<S>)>) -> Self
    where
        F: AsRef<str>,
        S: AsRef<str>,
    {
        self.row_filter = row_filter
            .into_iter()
            .map(|(field, accepted)| RowFilter {
                field: fold_lower(field.as_ref()),
                accepted: accepted.iter().map(|v| v.as_ref().trim().to_string()).collect(),
            })
            .collect();
        self
    }

    /// Result table name (upper case)
    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn row_count(&self) -> &[RowCount] {
        &self.row_count
    }

    pub fn row_filter(&self) -> &[RowFilter] {
        &self.row_filter
    }
}

/// Surface scalar export fields either as labels or as values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSpec {
    /// Field contents become extra labels; the record value is fixed at 1
    Labels(Vec<String>),
    /// One record per field with the field's numeric content
    Values(Vec<String>),
}

impl FieldSpec {
    pub fn labels<S: AsRef<str>>(fields: impl IntoIterator<Item = S>) -> Self {
        FieldSpec::Labels(fields.into_iter().map(|f| fold_lower(f.as_ref())).collect())
    }

    pub fn values<S: AsRef<str>>(fields: impl IntoIterator<Item = S>) -> Self {
        FieldSpec::Values(fields.into_iter().map(|f| fold_lower(f.as_ref())).collect())
    }
}

/// Read numeric members of an export structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureSpec {
    structure: String,
    fields: Vec<String>,
}

impl StructureSpec {
    pub fn new<S: AsRef<str>>(structure: &str, fields: impl IntoIterator<Item = S>) -> Self {
        Self {
            structure: fold_upper(structure),
            fields: fields.into_iter().map(|f| fold_lower(f.as_ref())).collect(),
        }
    }

    /// Export structure name (upper case)
    pub fn structure(&self) -> &str {
        &self.structure
    }

    /// Member field names (lower case)
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// The one extraction a metric performs on its function result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionSpec {
    Table(TableSpec),
    Field(FieldSpec),
    Structure(StructureSpec),
}

impl ExtractionSpec {
    pub fn kind(&self) -> ExtractionKind {
        match self {
            ExtractionSpec::Table(_) => ExtractionKind::Table,
            ExtractionSpec::Field(_) => ExtractionKind::Field,
            ExtractionSpec::Structure(_) => ExtractionKind::Structure,
        }
    }

    /// Pick the single configured spec
    ///
    /// # Errors
    ///
    /// Fails when none or more than one of the parts is present.
    pub fn from_parts(
        table: Option<TableSpec>,
        field: Option<FieldSpec>,
        structure: Option<StructureSpec>,
    ) -> AppResult<Self> {
        let mut present: Vec<ExtractionSpec> = Vec::with_capacity(1);
        present.extend(table.map(ExtractionSpec::Table));
        present.extend(field.map(ExtractionSpec::Field));
        present.extend(structure.map(ExtractionSpec::Structure));

        match present.len() {
            0 => Err(AppError::Config(
                "missing extraction spec: one of table, field or structure data is required"
                    .to_string(),
            )),
            1 => Ok(present.remove(0)),
            n => {
                let kinds: Vec<&str> = present.iter().map(|s| s.kind().as_str()).collect();
                Err(AppError::Config(format!(
                    "{} extraction specs given ({}), exactly one is allowed",
                    n,
                    kinds.join(", ")
                )))
            }
        }
    }
}

/// A validated metric definition
///
/// Fields are private; construction goes through [`MetricDefinition::new`] or
/// [`MetricDefinition::from_config`], both of which validate, so an existing definition
/// is always usable by the collector.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricDefinition {
    name: String,
    help: String,
    metric_type: MetricType,
    tag_filter: Vec<String>,
    all_servers: bool,
    function: String,
    params: Arc<CallParams>,
    spec: ExtractionSpec,
}

impl MetricDefinition {
    /// Create a definition with no tag filter, no parameters and a single server
    pub fn new(
        name: &str,
        help: &str,
        metric_type: MetricType,
        function: &str,
        spec: ExtractionSpec,
    ) -> AppResult<Self> {
        let name = fold_lower(name);
        if name.is_empty() || help.trim().is_empty() || function.trim().is_empty() {
            return Err(AppError::Config(format!(
                "metric '{}': name, help and function_module are mandatory",
                name
            )));
        }
        if !is_valid_metric_name(&name) {
            return Err(AppError::Config(format!(
                "metric '{}': not a valid Prometheus metric name",
                name
            )));
        }
        if name.starts_with(SELF_METRIC_PREFIX) {
            return Err(AppError::Config(format!(
                "metric '{}': the prefix '{}' is reserved for exporter metrics",
                name, SELF_METRIC_PREFIX
            )));
        }
        validate_spec(&spec).map_err(|reason| {
            AppError::Config(format!("metric '{}': {}", name, reason))
        })?;

        Ok(Self {
            name,
            help: help.trim().to_string(),
            metric_type,
            tag_filter: Vec::new(),
            all_servers: false,
            function: fold_upper(function),
            params: Arc::new(CallParams::new()),
            spec,
        })
    }

    /// Only collect from systems carrying all of these tags
    pub fn with_tag_filter<S: AsRef<str>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tag_filter = tags.into_iter().map(|t| fold_lower(t.as_ref())).collect();
        self
    }

    /// Call every application server of a system instead of just the primary one
    pub fn with_all_servers(mut self, all_servers: bool) -> Self {
        self.all_servers = all_servers;
        self
    }

    /// Set the call parameters; keys are upper-cased once here
    pub fn with_params(mut self, params: CallParams) -> AppResult<Self> {
        let folded = fold_param_keys(params).map_err(|reason| {
            AppError::Config(format!("metric '{}': {}", self.name, reason))
        })?;
        self.params = Arc::new(folded);
        Ok(self)
    }

    /// Build and validate a definition from a config entry declared under `declared`
    pub fn from_config(cfg: &MetricConfig, declared: ExtractionKind) -> AppResult<Self> {
        let label = if cfg.name.trim().is_empty() {
            "<unnamed>".to_string()
        } else {
            fold_lower(&cfg.name)
        };
        let context = |reason: String| AppError::Config(format!("metric '{}': {}", label, reason));

        let mut missing = Vec::new();
        for (field, value) in [
            ("name", &cfg.name),
            ("help", &cfg.help),
            ("metric_type", &cfg.metric_type),
            ("function_module", &cfg.function_module),
        ] {
            if value.trim().is_empty() {
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            return Err(context(format!(
                "missing mandatory field(s): {}",
                missing.join(", ")
            )));
        }

        let metric_type = MetricType::from_str(&cfg.metric_type)
            .map_err(|e| context(e.to_string()))?;

        let spec = ExtractionSpec::from_parts(
            table_part(cfg).map_err(&context)?,
            field_part(cfg).map_err(&context)?,
            structure_part(cfg).map_err(&context)?,
        )
        .map_err(|e| match e {
            AppError::Config(reason) => context(reason),
            other => other,
        })?;

        if spec.kind() != declared {
            return Err(context(format!(
                "declared under [[metrics.{}]] but defines {} extraction data",
                declared.as_str(),
                spec.kind().as_str()
            )));
        }

        let params: CallParams = cfg
            .params
            .iter()
            .map(|(key, value)| {
                serde_json::to_value(value)
                    .map(|json| (key.clone(), json))
                    .map_err(|e| context(format!("parameter '{}': {}", key, e)))
            })
            .collect::<AppResult<_>>()?;

        MetricDefinition::new(
            &cfg.name,
            &cfg.help,
            metric_type,
            &cfg.function_module,
            spec,
        )?
        .with_tag_filter(&cfg.tag_filter)
        .with_all_servers(cfg.all_servers)
        .with_params(params)
    }

    /// Metric name (lower case)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Required system tags (lower case)
    pub fn tag_filter(&self) -> &[String] {
        &self.tag_filter
    }

    pub fn all_servers(&self) -> bool {
        self.all_servers
    }

    /// Remote function module name (upper case)
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Shared, immutable call parameters
    pub fn params(&self) -> &Arc<CallParams> {
        &self.params
    }

    pub fn spec(&self) -> &ExtractionSpec {
        &self.spec
    }
}

/// Upper-case parameter keys, rejecting keys that collide after folding
fn fold_param_keys(params: CallParams) -> Result<CallParams, String> {
    let mut folded = CallParams::new();
    for (key, value) in params {
        let upper = fold_upper(&key);
        if upper.is_empty() {
            return Err("empty parameter name".to_string());
        }
        if folded.insert(upper.clone(), value).is_some() {
            return Err(format!(
                "parameter '{}' is given more than once (names are case-insensitive)",
                upper
            ));
        }
    }
    Ok(folded)
}

/// Checks on the spec that do not depend on where it came from
fn validate_spec(spec: &ExtractionSpec) -> Result<(), String> {
    match spec {
        ExtractionSpec::Table(table) => {
            if table.table().is_empty() || table.row_count().is_empty() {
                return Err("table extraction needs a table name and row_count".to_string());
            }
            for count in table.row_count() {
                if count.field().is_empty() {
                    return Err("row_count field names must not be empty".to_string());
                }
                if count.fragments().iter().any(|f| f.is_empty()) {
                    return Err(format!(
                        "row_count for '{}' contains an empty name fragment",
                        count.field()
                    ));
                }
            }
        }
        ExtractionSpec::Field(FieldSpec::Labels(fields)) => {
            if fields.is_empty() {
                return Err("field_labels must not be empty".to_string());
            }
            let mut seen: HashSet<&str> = BASE_LABELS.iter().copied().collect();
            for field in fields {
                if !is_valid_label_name(field) {
                    return Err(format!("field label '{}' is not a valid label name", field));
                }
                if !seen.insert(field.as_str()) {
                    return Err(format!("field label '{}' is used twice or reserved", field));
                }
            }
        }
        ExtractionSpec::Field(FieldSpec::Values(fields)) => {
            if fields.is_empty() || fields.iter().any(|f| f.is_empty()) {
                return Err("field_values must name at least one field".to_string());
            }
        }
        ExtractionSpec::Structure(structure) => {
            if structure.structure().is_empty()
                || structure.fields().is_empty()
                || structure.fields().iter().any(|f| f.is_empty())
            {
                return Err(
                    "structure extraction needs export_structure and structure_fields".to_string(),
                );
            }
        }
    }
    Ok(())
}

/// Row-count fragments and filter values may be written as strings or integers
fn config_scalar(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn scalar_map(
    entries: &BTreeMap<String, Vec<toml::Value>>,
    setting: &str,
) -> Result<Vec<(String, Vec<String>)>, String> {
    entries
        .iter()
        .map(|(field, values)| {
            let values = values
                .iter()
                .map(|v| {
                    config_scalar(v).ok_or_else(|| {
                        format!(
                            "{} for '{}': only string and integer values are allowed, got {}",
                            setting, field, v
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok((field.clone(), values))
        })
        .collect()
}

fn table_part(cfg: &MetricConfig) -> Result<Option<TableSpec>, String> {
    let has_table = !cfg.table.trim().is_empty();
    let has_count = !cfg.row_count.is_empty();
    let has_filter = !cfg.row_filter.is_empty();

    match (has_table, has_count) {
        (true, true) => {
            let row_count = scalar_map(&cfg.row_count, "row_count")?;
            let row_filter = scalar_map(&cfg.row_filter, "row_filter")?;
            Ok(Some(
                TableSpec::new(&cfg.table, row_count).with_row_filter(row_filter),
            ))
        }
        (false, false) if !has_filter => Ok(None),
        _ => Err("table data needs both 'table' and 'row_count'".to_string()),
    }
}

fn field_part(cfg: &MetricConfig) -> Result<Option<FieldSpec>, String> {
    match (cfg.field_labels.is_empty(), cfg.field_values.is_empty()) {
        (true, true) => Ok(None),
        (false, true) => Ok(Some(FieldSpec::labels(&cfg.field_labels))),
        (true, false) => Ok(Some(FieldSpec::values(&cfg.field_values))),
        (false, false) => {
            Err("only one of field_labels or field_values is allowed".to_string())
        }
    }
}

fn structure_part(cfg: &MetricConfig) -> Result<Option<StructureSpec>, String> {
    let has_structure = !cfg.export_structure.trim().is_empty();
    let has_fields = !cfg.structure_fields.is_empty();
    match (has_structure, has_fields) {
        (true, true) => Ok(Some(StructureSpec::new(
            &cfg.export_structure,
            &cfg.structure_fields,
        ))),
        (false, false) => Ok(None),
        _ => Err(
            "structure data needs both 'export_structure' and 'structure_fields'".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field_config() -> MetricConfig {
        MetricConfig {
            name: "SAP_Kernel_Info".to_string(),
            help: "Kernel release".to_string(),
            metric_type: "Gauge".to_string(),
            function_module: "th_saprel4".to_string(),
            field_labels: vec!["KERN_REL".to_string()],
            ..Default::default()
        }
    }

    fn table_spec() -> TableSpec {
        TableSpec::new("wplist", vec![("wp_typ", vec!["dia", "total"])])
    }

    #[test]
    fn test_exactly_one_spec_is_accepted() {
        let spec = ExtractionSpec::from_parts(Some(table_spec()), None, None)
            .expect("one spec is valid");
        assert_eq!(spec.kind(), ExtractionKind::Table);
    }

    #[test]
    fn test_zero_specs_are_rejected() {
        let err = ExtractionSpec::from_parts(None, None, None).unwrap_err();
        assert!(err.to_string().contains("missing extraction spec"));
    }

    #[test]
    fn test_two_specs_are_rejected() {
        let err = ExtractionSpec::from_parts(
            Some(table_spec()),
            Some(FieldSpec::values(["freemem"])),
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly one"));
        assert!(err.to_string().contains("table, field"));
    }

    #[test]
    fn test_from_config_normalizes_names() {
        let metric = MetricDefinition::from_config(&field_config(), ExtractionKind::Field)
            .expect("valid field metric");
        assert_eq!(metric.name(), "sap_kernel_info");
        assert_eq!(metric.function(), "TH_SAPREL4");
        assert_eq!(metric.metric_type(), MetricType::Gauge);
        assert_eq!(
            metric.spec(),
            &ExtractionSpec::Field(FieldSpec::Labels(vec!["kern_rel".to_string()]))
        );
    }

    #[test]
    fn test_from_config_reports_missing_mandatory_fields() {
        let cfg = MetricConfig {
            name: "sap_x".to_string(),
            ..Default::default()
        };
        let err = MetricDefinition::from_config(&cfg, ExtractionKind::Field).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("help"));
        assert!(msg.contains("metric_type"));
        assert!(msg.contains("function_module"));
    }

    #[test]
    fn test_from_config_rejects_both_field_kinds() {
        let mut cfg = field_config();
        cfg.field_values = vec!["freemem".to_string()];
        let err = MetricDefinition::from_config(&cfg, ExtractionKind::Field).unwrap_err();
        assert!(err.to_string().contains("only one of field_labels or field_values"));
    }

    #[test]
    fn test_from_config_rejects_table_without_row_count() {
        let mut cfg = field_config();
        cfg.field_labels.clear();
        cfg.table = "wplist".to_string();
        let err = MetricDefinition::from_config(&cfg, ExtractionKind::Table).unwrap_err();
        assert!(err.to_string().contains("row_count"));
    }

    #[test]
    fn test_from_config_rejects_kind_mismatch() {
        let err = MetricDefinition::from_config(&field_config(), ExtractionKind::Structure)
            .unwrap_err();
        assert!(err.to_string().contains("[[metrics.structure]]"));
    }

    #[test]
    fn test_from_config_rejects_two_specs() {
        let mut cfg = field_config();
        cfg.export_structure = "sysinfo".to_string();
        cfg.structure_fields = vec!["freemem".to_string()];
        let err = MetricDefinition::from_config(&cfg, ExtractionKind::Field).unwrap_err();
        assert!(err.to_string().contains("exactly one"));
    }

    #[test]
    fn test_from_config_rejects_invalid_metric_type() {
        let mut cfg = field_config();
        cfg.metric_type = "histogram".to_string();
        let err = MetricDefinition::from_config(&cfg, ExtractionKind::Field).unwrap_err();
        assert!(err.to_string().contains("gauge"));
    }

    #[test]
    fn test_from_config_accepts_integer_fragments() {
        let cfg = MetricConfig {
            name: "sap_jobs".to_string(),
            help: "Jobs".to_string(),
            metric_type: "counter".to_string(),
            function_module: "bapi_xbp_job_select".to_string(),
            table: "joblist".to_string(),
            row_count: BTreeMap::from([(
                "status".to_string(),
                vec![toml::Value::Integer(1), toml::Value::String("A".to_string())],
            )]),
            ..Default::default()
        };
        let metric = MetricDefinition::from_config(&cfg, ExtractionKind::Table)
            .expect("integer fragments are allowed");
        let ExtractionSpec::Table(table) = metric.spec() else {
            panic!("expected table spec");
        };
        assert_eq!(table.table(), "JOBLIST");
        assert_eq!(table.row_count()[0].fragments(), ["1", "a"]);
    }

    #[test]
    fn test_from_config_rejects_float_fragments() {
        let cfg = MetricConfig {
            name: "sap_jobs".to_string(),
            help: "Jobs".to_string(),
            metric_type: "counter".to_string(),
            function_module: "bapi_xbp_job_select".to_string(),
            table: "joblist".to_string(),
            row_count: BTreeMap::from([("status".to_string(), vec![toml::Value::Float(1.5)])]),
            ..Default::default()
        };
        let err = MetricDefinition::from_config(&cfg, ExtractionKind::Table).unwrap_err();
        assert!(err.to_string().contains("only string and integer"));
    }

    #[test]
    fn test_params_are_upper_cased_once() {
        let mut cfg = field_config();
        cfg.params = BTreeMap::from([
            ("rfc_dest".to_string(), toml::Value::String("NONE".to_string())),
            ("Max_Rows".to_string(), toml::Value::Integer(10)),
        ]);
        let metric = MetricDefinition::from_config(&cfg, ExtractionKind::Field)
            .expect("valid params");
        assert_eq!(metric.params().get("RFC_DEST"), Some(&json!("NONE")));
        assert_eq!(metric.params().get("MAX_ROWS"), Some(&json!(10)));
        assert!(metric.params().get("rfc_dest").is_none());
    }

    #[test]
    fn test_params_colliding_after_folding_are_rejected() {
        let mut params = CallParams::new();
        params.insert("mode".to_string(), json!("a"));
        params.insert("MODE".to_string(), json!("b"));
        let err = MetricDefinition::new(
            "sap_x",
            "help",
            MetricType::Gauge,
            "fm",
            ExtractionSpec::Field(FieldSpec::values(["x"])),
        )
        .expect("valid metric")
        .with_params(params)
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_reserved_field_label_is_rejected() {
        let err = MetricDefinition::new(
            "sap_x",
            "help",
            MetricType::Gauge,
            "fm",
            ExtractionSpec::Field(FieldSpec::labels(["server"])),
        )
        .unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_self_metric_prefix_is_rejected() {
        let err = MetricDefinition::new(
            "NWRFC_Exporter_Scrapes_Total",
            "help",
            MetricType::Counter,
            "fm",
            ExtractionSpec::Field(FieldSpec::values(["x"])),
        )
        .unwrap_err();
        assert!(err.to_string().contains("nwrfc_exporter_scrapes_total"));
        assert!(err.to_string().contains("reserved for exporter metrics"));
    }

    #[test]
    fn test_tag_filter_is_lower_cased() {
        let metric = MetricDefinition::new(
            "sap_x",
            "help",
            MetricType::Counter,
            "fm",
            ExtractionSpec::Field(FieldSpec::values(["x"])),
        )
        .expect("valid metric")
        .with_tag_filter(["ERP", " Abap "]);
        assert_eq!(metric.tag_filter(), ["erp", "abap"]);
    }
}
