//! JSON Schema validation for assembled samples.
//!
//! Every sample is checked against the loader's expectations before it is
//! handed to a sink, using JSON Schema Draft 7.
//!
//! # Embedded Schema
//!
//! The schema is embedded at compile time from `schemas/sample.json`.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use trail_import::validation::{validate_sample, is_valid_sample};
//!
//! let parent = json!({ "name": "AHe-01", "project": [{ "name": "Flowers – 2 samples" }] });
//! assert!(validate_sample(&parent).is_ok());
//!
//! let broken = json!({ "name": "AHe-01-1", "session": [{ "technique": { "id": "ICP-MS" } }] });
//! assert!(!is_valid_sample(&broken));
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static SAMPLE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/sample.json")).expect("Invalid embedded schema")
});

/// Validate a JSON value against a JSON schema.
///
/// Returns every validation error message when `data` does not conform.
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use trail_import::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["name"],
///     "properties": { "name": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "name": "AHe-01" })).is_ok());
/// assert!(validate(&schema, &json!({ "grain": 1 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick true/false check.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate against the sample schema.
pub fn validate_sample(data: &Value) -> Result<(), Vec<String>> {
    validate(&SAMPLE_SCHEMA, data)
}

/// Quick check against the sample schema.
pub fn is_valid_sample(data: &Value) -> bool {
    is_valid(&SAMPLE_SCHEMA, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_parent() {
        let sample = json!({
            "name": "AHe-01",
            "project": [{ "name": "Flowers – 2 samples" }]
        });
        assert!(is_valid_sample(&sample));
    }

    #[test]
    fn test_valid_grain() {
        let sample = json!({
            "name": "AHe-01-1",
            "material": "apatite",
            "member_of": { "name": "AHe-01" },
            "project": [{ "name": "Flowers – 2 samples" }],
            "session": [{
                "date": "2019-11-22T00:00:00",
                "technique": { "id": "(U+Th)/He thermochronology" },
                "target": { "id": "apatite" },
                "analysis": [{
                    "analysis_type": "Raw date",
                    "datum": [{
                        "value": 42.1,
                        "error": 1.3,
                        "type": { "parameter": "Raw Age", "unit": "Ma", "error_unit": "Ma" }
                    }],
                    "attribute": [{ "parameter": "Date Quality", "value": "Good" }]
                }]
            }]
        });
        assert!(validate_sample(&sample).is_ok());
    }

    #[test]
    fn test_missing_name() {
        let errors = validate_sample(&json!({ "material": "zircon" })).unwrap_err();
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_datum_value_must_be_number() {
        let sample = json!({
            "name": "AHe-01-1",
            "session": [{
                "date": "2019-11-22T00:00:00",
                "technique": { "id": "ICP-MS" },
                "analysis": [{
                    "analysis_type": "Element data",
                    "datum": [{ "value": null, "type": { "parameter": "U" } }],
                    "attribute": []
                }]
            }]
        });
        assert!(!is_valid_sample(&sample));
    }

    #[test]
    fn test_custom_schema() {
        let schema = json!({ "type": "object", "required": ["name"] });
        assert!(validate(&schema, &json!({ "name": "x" })).is_ok());
        assert!(!is_valid(&schema, &json!({})));
    }
}
