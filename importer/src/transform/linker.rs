//! Error Linker: attaches uncertainty-only columns to the value columns they annotate.
//!
//! Error columns are consumed; only value columns come out. When several error
//! columns point at the same value column, the last one in sheet order wins.

use std::collections::HashMap;

use super::resolver::ResolvedColumn;
use crate::models::CellValue;

/// A value column with its uncertainty, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedField<'a> {
    pub column: ResolvedColumn<'a>,
    pub error: Option<CellValue>,
    pub error_unit: Option<String>,
    pub error_metric: Option<String>,
}

/// Link error columns to their value columns.
pub fn link_errors(columns: Vec<ResolvedColumn<'_>>) -> Vec<LinkedField<'_>> {
    let (errors, values): (Vec<_>, Vec<_>) = columns
        .into_iter()
        .partition(|c| c.rule.is_error_column());

    // value index -> error column; later error columns overwrite earlier ones
    let mut error_for: HashMap<usize, &ResolvedColumn<'_>> = HashMap::new();
    for err in &errors {
        for &target in &err.rule.error_for {
            error_for.insert(target, err);
        }
    }

    values
        .into_iter()
        .map(|column| {
            let rule = column.rule;
            match error_for.get(&column.index) {
                Some(err) => LinkedField {
                    error: Some(err.value.clone()),
                    error_unit: rule
                        .error_unit
                        .clone()
                        .or_else(|| err.unit.clone())
                        .or_else(|| column.unit.clone()),
                    error_metric: rule
                        .error_metric
                        .clone()
                        .or_else(|| err.rule.error_metric.clone()),
                    column,
                },
                None => LinkedField {
                    error: None,
                    error_unit: rule.error_unit.clone(),
                    error_metric: rule.error_metric.clone(),
                    column,
                },
            }
        })
        .collect()
}
