//! Analysis Assembler: turns a slice of clean fields into an [`Analysis`].
//!
//! ```text
//! [CleanField, ...] ─▶ numeric? ──yes──▶ Datum { value, error, type: {...} }
//!                              └──no───▶ Attribute { parameter, value }
//! ```
//!
//! Fields whose value is still missing after normalization are left out.

use crate::models::{Analysis, Attribute, Datum, DatumType};
use super::normalizer::CleanField;

/// Split fields into datum candidates and attribute candidates.
///
/// A field is numeric iff its value parses as a float. Missing values are
/// dropped from both sides.
pub fn split_attributes(fields: &[CleanField]) -> (Vec<&CleanField>, Vec<&CleanField>) {
    fields
        .iter()
        .filter(|f| !f.value.is_missing())
        .partition(|f| f.value.as_number().is_some())
}

/// Build a datum from a numeric field.
pub fn create_datum(field: &CleanField) -> Option<Datum> {
    let value = field.value.as_number()?;
    Some(Datum {
        value,
        error: field.error,
        datum_type: DatumType {
            parameter: field.parameter.clone(),
            unit: field.unit.clone(),
            error_unit: field.error_unit.clone(),
            error_metric: field.error_metric.clone(),
            is_computed: field.is_computed,
            is_interpreted: field.is_interpreted,
            description: field.description.clone(),
        },
    })
}

/// Build an attribute, keeping only parameter and value.
pub fn create_attribute(field: &CleanField) -> Attribute {
    Attribute {
        parameter: field.parameter.clone(),
        value: field.value.to_string(),
    }
}

/// Assemble one analysis from a contiguous slice of fields.
pub fn create_analysis(analysis_type: &str, fields: &[CleanField]) -> Analysis {
    let (data, attributes) = split_attributes(fields);
    Analysis {
        analysis_type: analysis_type.to_string(),
        datum: data.into_iter().filter_map(create_datum).collect(),
        attribute: attributes.into_iter().map(create_attribute).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use crate::parser::Row;
    use crate::transform::linker::link_errors;
    use crate::transform::normalizer::{MissingValuePolicy, Normalizer};
    use crate::transform::resolver::{SpecResolver, UnitPattern};
    use crate::transform::spec::{ColumnSpecTable, DEFAULT_ERROR_METRIC};
    use serde_json::json;

    #[test]
    fn test_split_by_numeric_value() {
        let fields = vec![
            CleanField::new("Ft", 0.72),
            CleanField::new("Geometry", "Ellipsoid"),
            CleanField::new("Mass", "3.5"),
            CleanField::new("Np", CellValue::Missing),
        ];
        let (data, attributes) = split_attributes(&fields);
        let names: Vec<&str> = data.iter().map(|f| f.parameter.as_str()).collect();
        assert_eq!(names, vec!["Ft", "Mass"]);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes[0].parameter, "Geometry");
    }

    #[test]
    fn test_not_available_is_attribute() {
        let analysis = create_analysis("Grain shape", &[CleanField::new("Np", "N/A")]);
        assert!(analysis.datum.is_empty());
        assert_eq!(analysis.attribute[0].value, "N/A");
    }

    #[test]
    fn test_analysis_counts_match_slice() {
        let fields = vec![
            CleanField::new("Length 1", 120.0).with_unit("um"),
            CleanField::new("Geometry", "Cylinder"),
            CleanField::new("Np", 2.0),
            CleanField::new("Width 2", CellValue::Missing),
        ];
        let analysis = create_analysis("Grain shape", &fields);
        let dropped = fields.iter().filter(|f| f.value.is_missing()).count();
        assert_eq!(analysis.len(), fields.len() - dropped);
        assert_eq!(analysis.analysis_type, "Grain shape");
    }

    #[test]
    fn test_datum_serialization_shape() {
        let field = CleanField::new("Rs", 45.2).with_unit("um");
        let datum = create_datum(&field).unwrap();
        assert_eq!(
            serde_json::to_value(&datum).unwrap(),
            json!({"value": 45.2, "type": {"parameter": "Rs", "unit": "um"}})
        );

        let attribute = create_attribute(&CleanField::new("Geometry", 2.0));
        assert_eq!(attribute.value, "2");
    }

    #[test]
    fn test_age_and_error_become_one_datum() {
        let spec = ColumnSpecTable::from_yaml("- Age (Ma)\n- ±\n").unwrap();
        let units = UnitPattern::default();
        let row = Row::new(vec![
            ("Age (Ma)".into(), 42.1.into()),
            ("±".into(), 1.3.into()),
        ]);
        let resolution = SpecResolver::new(&spec, &units).resolve(&row);
        let (fields, warnings) =
            Normalizer::new(MissingValuePolicy::Unset).normalize(link_errors(resolution.columns));
        assert!(warnings.is_empty());

        let analysis = create_analysis("Raw date", &fields);
        assert_eq!(analysis.datum.len(), 1);
        assert!(analysis.attribute.is_empty());

        let datum = &analysis.datum[0];
        assert_eq!(datum.value, 42.1);
        assert_eq!(datum.error, Some(1.3));
        assert_eq!(datum.datum_type.parameter, "Age");
        assert_eq!(datum.datum_type.unit.as_deref(), Some("Ma"));
        assert_eq!(datum.datum_type.error_unit.as_deref(), Some("Ma"));
        assert_eq!(datum.datum_type.error_metric.as_deref(), Some(DEFAULT_ERROR_METRIC));
    }
}
