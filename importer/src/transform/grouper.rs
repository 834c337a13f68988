//! Group sheet rows into projects and derive sample/grain identity.
//!
//! The sheet has one row per grain, with the grain number glued onto the
//! sample name. Grouping happens once, before any row is assembled, since the
//! grain split depends on how many rows share a sample name.
//!
//! # Architecture
//!
//! ```text
//! Sheet rows                              Projects
//! ┌──────────────────────────────┐        ┌───────────────────────────────┐
//! │ Owner: Flowers, AHe-01-1     │        │ Flowers – 3 samples           │
//! │ Owner: Flowers, AHe-01-2     │   →    │   AHe-01-1 → AHe-01, grain 1  │
//! │ Owner: Flowers, ZHe_07-1     │        │   AHe-01-2 → AHe-01, grain 2  │
//! │ Owner: Reiners, BT-4         │        │   ZHe_07-1 → ZHe_07-1 (alone) │
//! └──────────────────────────────┘        ├───────────────────────────────┤
//!                                         │ Reiners – 1 samples           │
//!                                         └───────────────────────────────┘
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::models::Project;
use crate::parser::{Row, Table, OWNER_COLUMN, SAMPLE_NAME_COLUMN};

/// Rows with more than this share of missing cells are not imported.
pub const EMPTY_ROW_THRESHOLD: f64 = 0.8;

/// Whether a row is a spacer or otherwise content-free.
pub fn is_empty_row(row: &Row, column_count: usize) -> bool {
    row.missing_count() as f64 > column_count as f64 * EMPTY_ROW_THRESHOLD
}

// =============================================================================
// Grain derivation
// =============================================================================

/// Sample and grain derived from a full sample name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrainInfo {
    pub sample_name: String,
    /// `None` for rows that are the only member of their sample.
    pub grain: Option<String>,
}

impl GrainInfo {
    pub fn has_grain(&self) -> bool {
        self.grain.is_some()
    }
}

/// Split a full name on its last separator. Underscores count as dashes, but
/// the returned prefix keeps the original characters.
fn split_last_separator(full_name: &str) -> Option<(&str, &str)> {
    let pos = full_name.rfind(&['-', '_'][..])?;
    let (prefix, grain) = (&full_name[..pos], &full_name[pos + 1..]);
    if prefix.is_empty() || grain.is_empty() {
        return None;
    }
    Some((prefix, grain))
}

/// Derive sample/grain identity for a group of full names.
///
/// A prefix shared by a single name is not a sample of its own: that row is
/// treated as grain-less and keeps its full name.
pub fn split_grain_information(full_names: &[&str]) -> Vec<GrainInfo> {
    let splits: Vec<Option<(&str, &str)>> =
        full_names.iter().map(|n| split_last_separator(n)).collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (prefix, _) in splits.iter().flatten() {
        *counts.entry(*prefix).or_insert(0) += 1;
    }

    full_names
        .iter()
        .zip(splits)
        .map(|(full, split)| match split {
            Some((prefix, grain)) if counts.get(prefix).copied().unwrap_or(0) > 1 => GrainInfo {
                sample_name: prefix.to_string(),
                grain: Some(grain.to_string()),
            },
            _ => GrainInfo {
                sample_name: full.to_string(),
                grain: None,
            },
        })
        .collect()
}

// =============================================================================
// Project grouping
// =============================================================================

/// A row of a project, with its position in the sheet.
#[derive(Debug, Clone)]
pub struct GroupedRow<'t> {
    /// Zero-based data row index in the sheet.
    pub index: usize,
    pub row: &'t Row,
    pub full_name: String,
    pub grain: GrainInfo,
}

/// All rows of one owner.
#[derive(Debug, Clone)]
pub struct ProjectGroup<'t> {
    pub owner: String,
    pub project: Project,
    pub rows: Vec<GroupedRow<'t>>,
}

/// Result of grouping a sheet.
#[derive(Debug, Default)]
pub struct Grouping<'t> {
    /// Projects in owner order.
    pub projects: Vec<ProjectGroup<'t>>,
    /// Rows with no owner; they belong to no project.
    pub without_owner: Vec<usize>,
}

fn cell_text(row: &Row, header: &str) -> Option<String> {
    row.text(header)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Group the rows of a sheet by owner and derive grains per project.
pub fn group_projects(table: &Table) -> Grouping<'_> {
    let mut by_owner: BTreeMap<String, Vec<(usize, &Row)>> = BTreeMap::new();
    let mut without_owner = Vec::new();

    for (index, row) in table.rows.iter().enumerate() {
        match cell_text(row, OWNER_COLUMN) {
            Some(owner) => by_owner.entry(owner).or_default().push((index, row)),
            None => without_owner.push(index),
        }
    }

    let projects = by_owner
        .into_iter()
        .map(|(owner, rows)| {
            let full_names: Vec<String> = rows
                .iter()
                .map(|(_, row)| cell_text(row, SAMPLE_NAME_COLUMN).unwrap_or_default())
                .collect();
            let name_refs: Vec<&str> = full_names.iter().map(String::as_str).collect();
            let grains = split_grain_information(&name_refs);

            let project = Project::for_owner(&owner, rows.len());
            let rows = rows
                .into_iter()
                .zip(full_names)
                .zip(grains)
                .map(|(((index, row), full_name), grain)| GroupedRow {
                    index,
                    row,
                    full_name,
                    grain,
                })
                .collect();

            ProjectGroup {
                owner,
                project,
                rows,
            }
        })
        .collect();

    Grouping {
        projects,
        without_owner,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn table(rows: &[(&str, &str)]) -> Table {
        let headers = vec![
            OWNER_COLUMN.to_string(),
            SAMPLE_NAME_COLUMN.to_string(),
            "Ft".to_string(),
        ];
        Table::from_cells(
            headers,
            rows.iter()
                .map(|(owner, name)| vec![CellValue::parse(owner), CellValue::parse(name), 0.7.into()])
                .collect(),
        )
    }

    #[test]
    fn test_grain_split_singles_revert() {
        let info = split_grain_information(&["S1-1", "S1-2", "S2-1"]);
        let names: Vec<&str> = info.iter().map(|g| g.sample_name.as_str()).collect();
        let grains: Vec<Option<&str>> = info.iter().map(|g| g.grain.as_deref()).collect();
        assert_eq!(names, vec!["S1", "S1", "S2-1"]);
        assert_eq!(grains, vec![Some("1"), Some("2"), None]);
    }

    #[test]
    fn test_grain_split_keeps_underscores() {
        let info = split_grain_information(&["ZHe_07_1", "ZHe_07-2", "AHe-3"]);
        assert_eq!(info[0].sample_name, "ZHe_07");
        assert_eq!(info[1].sample_name, "ZHe_07");
        assert_eq!(info[1].grain.as_deref(), Some("2"));
        assert!(!info[2].has_grain());
    }

    #[test]
    fn test_grain_split_without_separator() {
        let info = split_grain_information(&["BT4", "BT5", "BT-"]);
        assert!(info.iter().all(|g| g.grain.is_none()));
        assert_eq!(info[1].sample_name, "BT5");
        assert_eq!(info[2].sample_name, "BT-");
    }

    #[test]
    fn test_empty_row_threshold() {
        let mut cells: Vec<(String, CellValue)> =
            (0..10).map(|i| (format!("c{}", i), CellValue::Missing)).collect();
        cells[0].1 = 1.0.into();
        assert!(is_empty_row(&Row::new(cells.clone()), 10));

        cells[1].1 = 1.0.into();
        cells[2].1 = 1.0.into();
        assert!(!is_empty_row(&Row::new(cells.clone()), 10));

        // Exactly 80% missing is still imported
        cells[2].1 = CellValue::Missing;
        assert!(!is_empty_row(&Row::new(cells), 10));
    }

    #[test]
    fn test_group_projects_by_owner() {
        let t = table(&[
            ("Reiners", "BT-4"),
            ("Flowers", "AHe-01-1"),
            ("", "orphan-1"),
            ("Flowers", "AHe-01-2"),
        ]);
        let grouping = group_projects(&t);

        assert_eq!(grouping.without_owner, vec![2]);
        assert_eq!(grouping.projects.len(), 2);

        let flowers = &grouping.projects[0];
        assert_eq!(flowers.owner, "Flowers");
        assert_eq!(flowers.project.name, "Flowers – 2 samples");
        let indices: Vec<usize> = flowers.rows.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert_eq!(flowers.rows[0].grain.sample_name, "AHe-01");
        assert_eq!(flowers.rows[1].grain.grain.as_deref(), Some("2"));

        let reiners = &grouping.projects[1];
        assert_eq!(reiners.rows[0].full_name, "BT-4");
        assert!(!reiners.rows[0].grain.has_grain());
    }

    #[test]
    fn test_grains_counted_per_owner() {
        // Same prefix under two owners: each is alone in its project
        let t = table(&[("A", "S1-1"), ("B", "S1-2")]);
        let grouping = group_projects(&t);
        assert!(grouping
            .projects
            .iter()
            .all(|p| p.rows.iter().all(|r| !r.grain.has_grain())));
    }
}
