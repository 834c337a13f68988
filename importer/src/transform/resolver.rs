//! Spec Resolver: pairs each cell of a row with its column rule.
//!
//! ```text
//! (header, value) ─┐
//!                  ├─▶ skip? ─▶ header check ─▶ "name (unit)" split ─▶ ResolvedColumn
//! ColumnRule ──────┘
//! ```

use regex::Regex;

use super::spec::{ColumnRule, ColumnSpecTable};
use super::warning::Warning;
use crate::models::CellValue;
use crate::parser::Row;

/// Pattern splitting `"<parameter> (<unit>)"` headers.
pub const UNIT_PATTERN: &str = r"^(.+)\s\(([a-zA-Z/%]+)\)$";

/// Compiled header/unit splitter.
#[derive(Debug, Clone)]
pub struct UnitPattern {
    regex: Regex,
}

impl UnitPattern {
    /// Use a custom pattern. It must capture the parameter and the unit.
    pub fn with_pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// Split a header into `(parameter, unit)`.
    pub fn split<'h>(&self, header: &'h str) -> Option<(&'h str, &'h str)> {
        let caps = self.regex.captures(header)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }
}

impl Default for UnitPattern {
    fn default() -> Self {
        Self {
            regex: Regex::new(UNIT_PATTERN).expect("Invalid unit pattern"),
        }
    }
}

/// One cell merged with its rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColumn<'a> {
    /// Physical column position.
    pub index: usize,
    pub parameter: String,
    pub unit: Option<String>,
    pub value: CellValue,
    pub rule: &'a ColumnRule,
}

/// Resolved columns of one row with the warnings raised on the way.
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    pub columns: Vec<ResolvedColumn<'a>>,
    pub warnings: Vec<Warning>,
}

/// Walks a row together with the column specification.
#[derive(Debug, Clone, Copy)]
pub struct SpecResolver<'a> {
    spec: &'a ColumnSpecTable,
    units: &'a UnitPattern,
}

impl<'a> SpecResolver<'a> {
    pub fn new(spec: &'a ColumnSpecTable, units: &'a UnitPattern) -> Self {
        Self { spec, units }
    }

    pub fn spec(&self) -> &'a ColumnSpecTable {
        self.spec
    }

    /// Resolve every non-skipped column of `row`.
    pub fn resolve(&self, row: &Row) -> Resolution<'a> {
        let mut resolution = Resolution::default();

        for (index, (rule, (header, value))) in self.spec.rules().iter().zip(&row.cells).enumerate() {
            if rule.skip {
                continue;
            }

            if let Some(declared) = rule.header.as_deref() {
                if declared != header {
                    resolution.warnings.push(Warning::HeaderMismatch {
                        index,
                        declared: declared.to_string(),
                        actual: header.clone(),
                    });
                }
            }

            let (parameter, unit) = match self.units.split(header) {
                Some((param, unit)) => (param.to_string(), Some(unit.to_string())),
                None => {
                    if !rule.is_error_column() {
                        resolution.warnings.push(Warning::UnitParse {
                            index,
                            header: header.clone(),
                        });
                    }
                    (header.clone(), None)
                }
            };

            resolution.columns.push(ResolvedColumn {
                index,
                parameter: rule.parameter.clone().unwrap_or(parameter),
                unit: rule.unit.clone().or(unit),
                value: value.clone(),
                rule,
            });
        }

        resolution
    }
}
