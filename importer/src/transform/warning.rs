//! Recoverable per-cell anomalies.
//!
//! None of these stop a row. They are collected alongside results and logged
//! once per distinct occurrence by the pipeline.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Warning {
    /// Declared header differs from the sheet's; the sheet's header is used.
    HeaderMismatch {
        index: usize,
        declared: String,
        actual: String,
    },
    /// Header has no `name (unit)` suffix; the whole header is the parameter.
    UnitParse { index: usize, header: String },
    /// A cell could not be coerced as its column expects; the raw value is kept.
    ValueCoercion {
        index: usize,
        parameter: String,
        value: String,
        message: String,
    },
}

impl Warning {
    /// Whether the warning is only worth showing in verbose mode.
    pub fn is_verbose_only(&self) -> bool {
        matches!(self, Warning::UnitParse { .. })
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::HeaderMismatch { index, declared, actual } => write!(
                f,
                "Column {}: header '{}' does not match '{}'",
                index, declared, actual
            ),
            Warning::UnitParse { index, header } => {
                write!(f, "Column {}: no unit in header '{}'", index, header)
            }
            Warning::ValueCoercion { index, parameter, value, message } => write!(
                f,
                "Column {} ({}), value '{}': {}",
                index, parameter, value, message
            ),
        }
    }
}
