//! Column specification: one declarative rule per physical sheet column.
//!
//! The specification is a YAML list, in physical column order. Each entry is
//! either a bare header string or a mapping:
//!
//! ```yaml
//! version: trail-2021
//! columns:
//!   - Owner
//!   - Full Sample Name
//!   - header: Geometry
//!     values: {1: Ellipsoid, 2: Cylinder}
//!   - U (ppm)
//!   - ±                       # error column for the previous column
//!   - header: Lab Log
//!     skip: true
//! ```
//!
//! A bare top-level list (no `version`) is accepted too. Rules are normalized
//! into [`ColumnRule`] as soon as they are loaded, and the `±` shorthand is
//! expanded at that point.

use serde::Deserialize;
use serde_yaml::Value as YamlValue;
use std::path::Path;

use crate::error::{SpecError, SpecResult};
use crate::models::CellValue;

/// Header of a stand-alone uncertainty column.
pub const ERROR_MARKER: &str = "±";

/// Error metric given to `±` columns that do not declare one.
pub const DEFAULT_ERROR_METRIC: &str = "1s analytical uncertainty";

/// Version tag assumed when the specification file has none.
pub const DEFAULT_VERSION: &str = "trail-2021";

const BUNDLED_SPEC: &str = include_str!("../../column-spec.yaml");

/// Fields of a rule as written in the YAML file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleFields {
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    parameter: Option<String>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    error_unit: Option<String>,
    #[serde(default)]
    error_for: Option<ErrorFor>,
    #[serde(default)]
    error_metric: Option<String>,
    #[serde(default)]
    skip: bool,
    #[serde(default)]
    values: Option<serde_yaml::Mapping>,
    #[serde(default)]
    is_computed: Option<bool>,
    #[serde(default)]
    is_interpreted: Option<bool>,
    #[serde(default)]
    description: Option<String>,
}

/// `error_for` accepts one column index or a list of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorFor {
    One(i64),
    Many(Vec<i64>),
}

impl ErrorFor {
    fn into_vec(self) -> Vec<i64> {
        match self {
            ErrorFor::One(i) => vec![i],
            ErrorFor::Many(v) => v,
        }
    }
}

/// A normalized rule for one physical column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnRule {
    /// Expected physical header; `None` for error columns and header-less rules.
    pub header: Option<String>,
    /// Overrides the parameter derived from the header.
    pub parameter: Option<String>,
    /// Overrides the unit derived from the header.
    pub unit: Option<String>,
    pub error_unit: Option<String>,
    /// Value columns this column holds the uncertainty for. Empty for value columns.
    pub error_for: Vec<usize>,
    pub error_metric: Option<String>,
    pub skip: bool,
    /// Categorical substitution, raw → normalized, in declaration order.
    pub values: Vec<(CellValue, CellValue)>,
    pub is_computed: Option<bool>,
    pub is_interpreted: Option<bool>,
    pub description: Option<String>,
}

impl ColumnRule {
    /// Rule for a plain header, the shorthand form.
    pub fn header(header: impl Into<String>) -> Self {
        Self {
            header: Some(header.into()),
            ..Default::default()
        }
    }

    /// Rule for an uncertainty column annotating `targets`.
    pub fn error_for(targets: Vec<usize>) -> Self {
        Self {
            error_for: targets,
            error_metric: Some(DEFAULT_ERROR_METRIC.to_string()),
            ..Default::default()
        }
    }

    /// Mark the column as not imported.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Add a categorical substitution.
    pub fn with_value(mut self, raw: impl Into<CellValue>, normalized: impl Into<CellValue>) -> Self {
        self.values.push((raw.into(), normalized.into()));
        self
    }

    pub fn is_error_column(&self) -> bool {
        !self.error_for.is_empty()
    }

    /// Whether the column produces a clean field downstream.
    pub fn is_retained(&self) -> bool {
        !self.skip && !self.is_error_column()
    }

    /// Normalize one YAML entry at physical position `index`.
    fn from_yaml(index: usize, entry: YamlValue) -> SpecResult<Self> {
        let fields = match entry {
            YamlValue::String(header) => RuleFields {
                header: Some(header),
                ..Default::default()
            },
            mapping @ YamlValue::Mapping(_) => serde_yaml::from_value::<RuleFields>(mapping)
                .map_err(|e| SpecError::InvalidRule {
                    index,
                    message: e.to_string(),
                })?,
            other => {
                return Err(SpecError::InvalidRule {
                    index,
                    message: format!("expected a header string or a mapping, got {:?}", other),
                });
            }
        };
        Self::from_fields(index, fields)
    }

    fn from_fields(index: usize, fields: RuleFields) -> SpecResult<Self> {
        let mut header = fields.header;
        let mut error_for = fields.error_for.map(ErrorFor::into_vec);
        let mut error_metric = fields.error_metric;

        // Expand the ± shorthand
        if header.as_deref() == Some(ERROR_MARKER) {
            header = None;
            error_for.get_or_insert_with(|| vec![index as i64 - 1]);
            error_metric.get_or_insert_with(|| DEFAULT_ERROR_METRIC.to_string());
        }

        let error_for = error_for
            .unwrap_or_default()
            .into_iter()
            .map(|target| {
                if target < 0 || target as usize >= index {
                    Err(SpecError::ForwardErrorReference { index, target })
                } else {
                    Ok(target as usize)
                }
            })
            .collect::<SpecResult<Vec<_>>>()?;

        let values = match fields.values {
            Some(mapping) => mapping
                .into_iter()
                .map(|(k, v)| Ok((yaml_to_cell(index, k)?, yaml_to_cell(index, v)?)))
                .collect::<SpecResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            header,
            parameter: fields.parameter,
            unit: fields.unit,
            error_unit: fields.error_unit,
            error_for,
            error_metric,
            skip: fields.skip,
            values,
            is_computed: fields.is_computed,
            is_interpreted: fields.is_interpreted,
            description: fields.description,
        })
    }
}

/// Convert a scalar from a `values` mapping into a cell value.
fn yaml_to_cell(index: usize, value: YamlValue) -> SpecResult<CellValue> {
    match value {
        YamlValue::Null => Ok(CellValue::Missing),
        YamlValue::Bool(b) => Ok(CellValue::Text(b.to_string())),
        YamlValue::Number(n) => n.as_f64().map(CellValue::Number).ok_or_else(|| {
            SpecError::InvalidRule {
                index,
                message: format!("unrepresentable number {}", n),
            }
        }),
        YamlValue::String(s) => Ok(CellValue::Text(s)),
        other => Err(SpecError::InvalidRule {
            index,
            message: format!("categorical values must be scalars, got {:?}", other),
        }),
    }
}

/// The ordered list of rules, one per physical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpecTable {
    version: String,
    rules: Vec<ColumnRule>,
}

impl ColumnSpecTable {
    /// Build a table from already normalized rules, checking error references.
    pub fn from_rules(version: impl Into<String>, rules: Vec<ColumnRule>) -> SpecResult<Self> {
        for (index, rule) in rules.iter().enumerate() {
            if let Some(&target) = rule.error_for.iter().find(|&&t| t >= index) {
                return Err(SpecError::ForwardErrorReference {
                    index,
                    target: target as i64,
                });
            }
        }
        Ok(Self {
            version: version.into(),
            rules,
        })
    }

    /// Parse a specification from YAML text.
    pub fn from_yaml(yaml: &str) -> SpecResult<Self> {
        let document: YamlValue = serde_yaml::from_str(yaml)?;

        let (version, entries) = match document {
            YamlValue::Sequence(entries) => (DEFAULT_VERSION.to_string(), entries),
            YamlValue::Mapping(mut map) => {
                let version = match map.remove("version") {
                    Some(YamlValue::String(v)) => v,
                    Some(YamlValue::Number(n)) => n.to_string(),
                    Some(_) => {
                        return Err(SpecError::UnsupportedVersion(
                            "version must be a string".to_string(),
                        ))
                    }
                    None => DEFAULT_VERSION.to_string(),
                };
                let entries = match map.remove("columns") {
                    Some(YamlValue::Sequence(entries)) => entries,
                    _ => {
                        return Err(SpecError::InvalidRule {
                            index: 0,
                            message: "expected a 'columns' list".to_string(),
                        })
                    }
                };
                (version, entries)
            }
            _ => {
                return Err(SpecError::InvalidRule {
                    index: 0,
                    message: "expected a list of column rules".to_string(),
                })
            }
        };

        let rules = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| ColumnRule::from_yaml(i, entry))
            .collect::<SpecResult<Vec<_>>>()?;

        Self::from_rules(version, rules)
    }

    /// Load a specification file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> SpecResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The specification shipped with the importer.
    pub fn bundled() -> SpecResult<Self> {
        Self::from_yaml(BUNDLED_SPEC)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    pub fn get(&self, index: usize) -> Option<&ColumnRule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Number of columns that survive as clean fields.
    pub fn retained_len(&self) -> usize {
        self.rules.iter().filter(|r| r.is_retained()).count()
    }

    /// Number of columns not marked `skip`.
    pub fn unskipped_len(&self) -> usize {
        self.rules.iter().filter(|r| !r.skip).count()
    }

    /// Fail unless the sheet has exactly one column per rule.
    pub fn check_columns(&self, actual: usize) -> SpecResult<()> {
        if self.rules.len() == actual {
            Ok(())
        } else {
            Err(SpecError::Mismatch {
                expected: self.rules.len(),
                actual,
            })
        }
    }

    /// Declared headers that differ from the sheet's, as `(index, declared, actual)`.
    pub fn header_mismatches<'a>(&'a self, headers: &'a [String]) -> Vec<(usize, &'a str, &'a str)> {
        self.rules
            .iter()
            .zip(headers)
            .enumerate()
            .filter_map(|(i, (rule, actual))| match rule.header.as_deref() {
                Some(declared) if declared != actual => Some((i, declared, actual.as_str())),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorthand_and_full_rules() {
        let yaml = r#"
- Owner
- header: Geometry
  values: {1: Ellipsoid, 2: Cylinder}
- header: Lab Log
  skip: true
"#;
        let spec = ColumnSpecTable::from_yaml(yaml).unwrap();
        assert_eq!(spec.len(), 3);
        assert_eq!(spec.version(), DEFAULT_VERSION);
        assert_eq!(spec.rules()[0], ColumnRule::header("Owner"));

        let geometry = &spec.rules()[1];
        assert_eq!(geometry.values.len(), 2);
        assert_eq!(geometry.values[0], (CellValue::Number(1.0), CellValue::Text("Ellipsoid".into())));

        assert!(spec.rules()[2].skip);
        assert_eq!(spec.retained_len(), 2);
    }

    #[test]
    fn test_plus_minus_expansion() {
        let yaml = "- Owner\n- Age (Ma)\n- ±\n";
        let spec = ColumnSpecTable::from_yaml(yaml).unwrap();

        let err = &spec.rules()[2];
        assert_eq!(err.header, None);
        assert_eq!(err.error_for, vec![1]);
        assert_eq!(err.error_metric.as_deref(), Some(DEFAULT_ERROR_METRIC));
        assert!(!err.is_retained());
    }

    #[test]
    fn test_plus_minus_overrides_kept() {
        let yaml = r#"
- U (ppm)
- Th (ppm)
- header: ±
  error_for: [0, 1]
  error_metric: 2s analytical uncertainty
"#;
        let spec = ColumnSpecTable::from_yaml(yaml).unwrap();
        let err = &spec.rules()[2];
        assert_eq!(err.error_for, vec![0, 1]);
        assert_eq!(err.error_metric.as_deref(), Some("2s analytical uncertainty"));
    }

    #[test]
    fn test_error_column_first_is_rejected() {
        let err = ColumnSpecTable::from_yaml("- ±\n- Age (Ma)\n").unwrap_err();
        assert!(matches!(err, SpecError::ForwardErrorReference { index: 0, target: -1 }));
    }

    #[test]
    fn test_forward_reference_rejected() {
        let yaml = r#"
- header: U err
  error_for: 1
- U (ppm)
"#;
        let err = ColumnSpecTable::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SpecError::ForwardErrorReference { index: 0, target: 1 }));

        let rules = vec![ColumnRule::error_for(vec![0]), ColumnRule::header("x")];
        assert!(ColumnSpecTable::from_rules("v", rules).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let yaml = "- header: Ft\n  colour: red\n";
        let err = ColumnSpecTable::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, SpecError::InvalidRule { index: 0, .. }));
    }

    #[test]
    fn test_versioned_document() {
        let yaml = "version: trail-2021\ncolumns:\n  - Owner\n  - Full Sample Name\n";
        let spec = ColumnSpecTable::from_yaml(yaml).unwrap();
        assert_eq!(spec.version(), "trail-2021");
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn test_check_columns() {
        let spec = ColumnSpecTable::from_yaml("- a\n- b\n").unwrap();
        assert!(spec.check_columns(2).is_ok());
        assert!(matches!(
            spec.check_columns(3),
            Err(SpecError::Mismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_header_mismatches() {
        let spec = ColumnSpecTable::from_yaml("- Owner\n- Age (Ma)\n- ±\n").unwrap();
        let headers = vec!["Owner".to_string(), "Age (ka)".to_string(), "±".to_string()];
        assert_eq!(spec.header_mismatches(&headers), vec![(1, "Age (Ma)", "Age (ka)")]);
    }

    #[test]
    fn test_bundled_spec_loads() {
        let spec = ColumnSpecTable::bundled().unwrap();
        assert_eq!(spec.version(), DEFAULT_VERSION);
        assert_eq!(spec.len(), 38);
        assert_eq!(spec.retained_len(), 31);
    }
}
