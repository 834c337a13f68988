//! Value Normalizer: missing-value policy and categorical substitution.
//!
//! Applied to every linked field in order:
//!
//! 1. Missing-value policy on the value (see [`MissingValuePolicy`])
//! 2. Categorical substitution through the rule's `values` mapping
//! 3. Error cleanup: a missing error becomes "no error"
//!
//! The output keeps one [`CleanField`] per retained column, in sheet order, so
//! that the layout can slice it by position.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::linker::LinkedField;
use super::warning::Warning;
use crate::error::ConfigError;
use crate::models::CellValue;

/// Placeholder text written by [`MissingValuePolicy::NotAvailable`].
pub const NOT_AVAILABLE: &str = "N/A";

// =============================================================================
// Missing Value Policy
// =============================================================================

/// What to do with a missing value cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingValuePolicy {
    /// Keep the value missing; the assembler leaves the field out.
    #[default]
    Unset,
    /// Substitute `0`, producing a datum.
    Zero,
    /// Substitute the text `"N/A"`, producing an attribute.
    NotAvailable,
}

impl MissingValuePolicy {
    /// Apply the policy to one value. Non-missing values pass through.
    pub fn apply(self, value: CellValue) -> CellValue {
        if !value.is_missing() {
            return value;
        }
        match self {
            MissingValuePolicy::Unset => CellValue::Missing,
            MissingValuePolicy::Zero => CellValue::Number(0.0),
            MissingValuePolicy::NotAvailable => CellValue::Text(NOT_AVAILABLE.to_string()),
        }
    }
}

impl FromStr for MissingValuePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unset" | "none" => Ok(MissingValuePolicy::Unset),
            "zero" | "0" => Ok(MissingValuePolicy::Zero),
            "not-available" | "n/a" | "na" => Ok(MissingValuePolicy::NotAvailable),
            _ => Err(ConfigError::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for MissingValuePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MissingValuePolicy::Unset => "unset",
            MissingValuePolicy::Zero => "zero",
            MissingValuePolicy::NotAvailable => "not-available",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Clean Fields
// =============================================================================

/// A normalized field, ready for the assembler. Carries no column index.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanField {
    pub parameter: String,
    pub unit: Option<String>,
    pub value: CellValue,
    /// Numeric uncertainty. `None` means unmeasured, not zero.
    pub error: Option<f64>,
    pub error_unit: Option<String>,
    pub error_metric: Option<String>,
    pub is_computed: Option<bool>,
    pub is_interpreted: Option<bool>,
    pub description: Option<String>,
}

impl CleanField {
    /// Plain field with only a parameter and a value.
    pub fn new(parameter: impl Into<String>, value: impl Into<CellValue>) -> Self {
        Self {
            parameter: parameter.into(),
            unit: None,
            value: value.into(),
            error: None,
            error_unit: None,
            error_metric: None,
            is_computed: None,
            is_interpreted: None,
            description: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_error(mut self, error: f64) -> Self {
        self.error = Some(error);
        self
    }

    /// Textual value, if the field holds text.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            CellValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// =============================================================================
// Normalizer
// =============================================================================

/// Normalizes linked fields under a missing-value policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    policy: MissingValuePolicy,
}

impl Normalizer {
    pub fn new(policy: MissingValuePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> MissingValuePolicy {
        self.policy
    }

    /// Normalize a row's linked fields.
    pub fn normalize(&self, fields: Vec<LinkedField<'_>>) -> (Vec<CleanField>, Vec<Warning>) {
        let mut warnings = Vec::new();
        let clean = fields
            .into_iter()
            .map(|field| self.normalize_field(field, &mut warnings))
            .collect();
        (clean, warnings)
    }

    fn normalize_field(&self, field: LinkedField<'_>, warnings: &mut Vec<Warning>) -> CleanField {
        let LinkedField {
            column,
            error,
            error_unit,
            error_metric,
        } = field;
        let rule = column.rule;

        let mut value = self.policy.apply(column.value);

        if !rule.values.is_empty() && !value.is_missing() {
            match rule.values.iter().find(|(raw, _)| value.matches_key(raw)) {
                Some((_, normalized)) => value = normalized.clone(),
                // Already-normalized values are not reported again
                None if rule.values.iter().any(|(_, n)| value.matches_key(n)) => {}
                None => warnings.push(Warning::ValueCoercion {
                    index: column.index,
                    parameter: column.parameter.clone(),
                    value: value.to_string(),
                    message: "not a recognized categorical value".to_string(),
                }),
            }
        }

        let error = match error {
            None => None,
            Some(raw) if raw.is_missing() => None,
            Some(raw) => {
                let problem = match raw.as_number() {
                    Some(n) if n >= 0.0 => None,
                    Some(_) => Some("uncertainty is negative; dropped"),
                    None => Some("uncertainty is not numeric; dropped"),
                };
                match problem {
                    None => raw.as_number(),
                    Some(message) => {
                        warnings.push(Warning::ValueCoercion {
                            index: column.index,
                            parameter: column.parameter.clone(),
                            value: raw.to_string(),
                            message: message.to_string(),
                        });
                        None
                    }
                }
            }
        };

        // Error metadata only makes sense next to an error
        let (error_unit, error_metric) = if error.is_some() {
            (error_unit, error_metric)
        } else {
            (None, None)
        };

        CleanField {
            parameter: column.parameter,
            unit: column.unit,
            value,
            error,
            error_unit,
            error_metric,
            is_computed: rule.is_computed,
            is_interpreted: rule.is_interpreted,
            description: rule.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Row;
    use crate::transform::linker::link_errors;
    use crate::transform::resolver::{SpecResolver, UnitPattern};
    use crate::transform::spec::ColumnSpecTable;

    fn normalize(
        yaml: &str,
        cells: Vec<(&str, CellValue)>,
        policy: MissingValuePolicy,
    ) -> (Vec<CleanField>, Vec<Warning>) {
        let spec = ColumnSpecTable::from_yaml(yaml).unwrap();
        let units = UnitPattern::default();
        let row = Row::new(cells.into_iter().map(|(h, v)| (h.to_string(), v)).collect());
        let resolution = SpecResolver::new(&spec, &units).resolve(&row);
        Normalizer::new(policy).normalize(link_errors(resolution.columns))
    }

    #[test]
    fn test_policy_parse_and_display() {
        assert_eq!("zero".parse::<MissingValuePolicy>().unwrap(), MissingValuePolicy::Zero);
        assert_eq!(
            "Not-Available".parse::<MissingValuePolicy>().unwrap(),
            MissingValuePolicy::NotAvailable
        );
        assert_eq!(MissingValuePolicy::default(), MissingValuePolicy::Unset);
        assert_eq!(MissingValuePolicy::NotAvailable.to_string(), "not-available");
        assert!(matches!(
            "sometimes".parse::<MissingValuePolicy>(),
            Err(ConfigError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_missing_value_policies() {
        let yaml = "- Ft\n";
        let (unset, _) = normalize(yaml, vec![("Ft", CellValue::Missing)], MissingValuePolicy::Unset);
        assert_eq!(unset[0].value, CellValue::Missing);

        let (zero, _) = normalize(yaml, vec![("Ft", CellValue::Missing)], MissingValuePolicy::Zero);
        assert_eq!(zero[0].value, CellValue::Number(0.0));

        let (na, _) = normalize(yaml, vec![("Ft", CellValue::Missing)], MissingValuePolicy::NotAvailable);
        assert_eq!(na[0].value, CellValue::Text("N/A".into()));
    }

    #[test]
    fn test_nan_cell_follows_policy() {
        let yaml = "- Np\n";
        let cases = [
            (MissingValuePolicy::Unset, CellValue::Missing),
            (MissingValuePolicy::Zero, CellValue::Number(0.0)),
            (MissingValuePolicy::NotAvailable, CellValue::Text("N/A".into())),
        ];
        for (policy, expected) in cases {
            for cell in [CellValue::Number(f64::NAN), CellValue::parse("NAN")] {
                let (clean, warnings) = normalize(yaml, vec![("Np", cell)], policy);
                assert_eq!(clean[0].value, expected, "{}", policy);
                assert!(warnings.is_empty());
            }
        }
    }

    #[test]
    fn test_nan_error_is_absent() {
        let (clean, warnings) = normalize(
            "- Age (Ma)\n- ±\n",
            vec![("Age (Ma)", 42.0.into()), ("±", CellValue::Number(f64::NAN))],
            MissingValuePolicy::Zero,
        );
        assert_eq!(clean[0].error, None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_negative_error_is_dropped_with_warning() {
        let (clean, warnings) = normalize(
            "- Age (Ma)\n- ±\n",
            vec![("Age (Ma)", 42.0.into()), ("±", (-0.4).into())],
            MissingValuePolicy::Unset,
        );
        assert_eq!(clean[0].value, CellValue::Number(42.0));
        assert_eq!(clean[0].error, None);
        assert_eq!(clean[0].error_unit, None);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Warning::ValueCoercion { index: 0, .. }));
    }

    #[test]
    fn test_missing_error_is_absent() {
        let (clean, warnings) = normalize(
            "- Age (Ma)\n- ±\n",
            vec![("Age (Ma)", 42.0.into()), ("±", CellValue::Missing)],
            MissingValuePolicy::Zero,
        );
        assert_eq!(clean.len(), 1);
        assert_eq!(clean[0].error, None);
        assert_eq!(clean[0].error_metric, None);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_text_error_is_dropped_with_warning() {
        let (clean, warnings) = normalize(
            "- Age (Ma)\n- ±\n",
            vec![("Age (Ma)", 42.0.into()), ("±", "n.d.".into())],
            MissingValuePolicy::Unset,
        );
        assert_eq!(clean[0].error, None);
        assert_eq!(warnings.len(), 1);
        assert!(matches!(warnings[0], Warning::ValueCoercion { index: 0, .. }));
    }

    #[test]
    fn test_numeric_text_error_is_kept() {
        let (clean, _) = normalize(
            "- Age (Ma)\n- ±\n",
            vec![("Age (Ma)", 42.0.into()), ("±", "1.25".into())],
            MissingValuePolicy::Unset,
        );
        assert_eq!(clean[0].error, Some(1.25));
        assert_eq!(clean[0].error_unit.as_deref(), Some("Ma"));
    }

    #[test]
    fn test_categorical_substitution() {
        let yaml = "- header: Geometry\n  values: {1: Ellipsoid, 2: Cylinder}\n";
        let (clean, warnings) = normalize(yaml, vec![("Geometry", 2.0.into())], MissingValuePolicy::Unset);
        assert_eq!(clean[0].value, CellValue::Text("Cylinder".into()));
        assert!(warnings.is_empty());

        // Stored as text in the export
        let (clean, _) = normalize(yaml, vec![("Geometry", "1".into())], MissingValuePolicy::Unset);
        assert_eq!(clean[0].value, CellValue::Text("Ellipsoid".into()));
    }

    #[test]
    fn test_unrecognized_categorical_passes_through() {
        let yaml = "- header: Date Quality\n  values: {G: Good, R: Rejected}\n";
        let (clean, warnings) = normalize(yaml, vec![("Date Quality", "X".into())], MissingValuePolicy::Unset);
        assert_eq!(clean[0].value, CellValue::Text("X".into()));
        assert_eq!(warnings.len(), 1);

        // Missing cells are left to the missing-value policy
        let (clean, warnings) = normalize(yaml, vec![("Date Quality", CellValue::Missing)], MissingValuePolicy::Unset);
        assert!(clean[0].value.is_missing());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_metadata_carried_over() {
        let yaml = "- header: Rs (um)\n  is_computed: true\n  description: Equivalent spherical radius\n";
        let (clean, _) = normalize(yaml, vec![("Rs (um)", 45.0.into())], MissingValuePolicy::Unset);
        assert_eq!(clean[0].parameter, "Rs");
        assert_eq!(clean[0].unit.as_deref(), Some("um"));
        assert_eq!(clean[0].is_computed, Some(true));
        assert_eq!(clean[0].description.as_deref(), Some("Equivalent spherical radius"));
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let yaml = "- header: Geometry\n  values: {1: Ellipsoid}\n- Ft\n- Np\n- Mass (ug)\n";
        for policy in [
            MissingValuePolicy::Unset,
            MissingValuePolicy::Zero,
            MissingValuePolicy::NotAvailable,
        ] {
            let cells = vec![
                ("Geometry", CellValue::Number(1.0)),
                ("Ft", CellValue::Number(0.72)),
                ("Np", CellValue::Missing),
                ("Mass (ug)", CellValue::Text("3.5".into())),
            ];
            let (once, _) = normalize(yaml, cells, policy);

            let again: Vec<(&str, CellValue)> = ["Geometry", "Ft", "Np", "Mass (ug)"]
                .iter()
                .zip(&once)
                .map(|(h, f)| (*h, f.value.clone()))
                .collect();
            let (twice, warnings) = normalize(yaml, again, policy);

            assert!(warnings.is_empty());
            for (a, b) in once.iter().zip(&twice) {
                assert_eq!(a.value, b.value);
                assert_eq!(a.value.as_number().is_some(), b.value.as_number().is_some());
            }
        }
    }
}
