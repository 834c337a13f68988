//! Sheet layouts: which clean fields feed which analysis and session.
//!
//! The reduction sheet groups its columns by meaning, and those groups are
//! only known by position. Each layout is tied to a column-spec version tag,
//! so a reordered sheet needs a new version rather than silently shifting
//! fields into the wrong analysis.
//!
//! ```text
//! clean field  0      1       2..8   8..11    11..22   22..24  24..27   27       28..
//!            Owner  Sample  shape  derived  elements   raw   corrected Mineral  notes
//!                            └──── morphology ───┘  └ ICP-MS ┘ └─── (U+Th)/He ───┘
//! ```

use std::ops::Range;

use super::normalizer::CleanField;
use super::spec::ColumnSpecTable;
use crate::error::{SpecError, SpecResult};

// =============================================================================
// trail-2021 offsets
// =============================================================================

pub const OWNER_FIELD: usize = 0;
pub const SAMPLE_NAME_FIELD: usize = 1;
pub const SHAPE_RANGE: Range<usize> = 2..8;
pub const DERIVED_RANGE: Range<usize> = 8..11;
pub const ELEMENT_RANGE: Range<usize> = 11..22;
pub const RAW_DATE_RANGE: Range<usize> = 22..24;
pub const CORRECTED_DATE_RANGE: Range<usize> = 24..27;
/// Mineral name; becomes the sample material and the session target.
pub const MATERIAL_FIELD: usize = 27;
/// Free-text grain notes, appended to the grain-shape analysis.
pub const GRAIN_NOTES_START: usize = 28;

// =============================================================================
// Layout types
// =============================================================================

/// A run of clean fields.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSlice {
    Range(Range<usize>),
    /// Everything from this position to the end of the row.
    From(usize),
}

impl FieldSlice {
    /// The fields this slice covers, clamped to what the row has.
    pub fn select<'f>(&self, fields: &'f [CleanField]) -> &'f [CleanField] {
        let (start, end) = match self {
            FieldSlice::Range(r) => (r.start, r.end),
            FieldSlice::From(start) => (*start, fields.len()),
        };
        let end = end.min(fields.len());
        let start = start.min(end);
        &fields[start..end]
    }

    /// Smallest row length that fully covers the slice.
    fn required_len(&self) -> usize {
        match self {
            FieldSlice::Range(r) => r.end,
            FieldSlice::From(start) => *start,
        }
    }
}

/// One analysis assembled from one or more field slices.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisLayout {
    pub analysis_type: &'static str,
    pub slices: Vec<FieldSlice>,
}

impl AnalysisLayout {
    /// Concatenate the selected fields, in slice order.
    pub fn collect(&self, fields: &[CleanField]) -> Vec<CleanField> {
        self.slices
            .iter()
            .flat_map(|s| s.select(fields).iter().cloned())
            .collect()
    }
}

/// Fixed metadata and analyses of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionLayout {
    pub technique: &'static str,
    pub instrument: Option<&'static str>,
    pub analyses: Vec<AnalysisLayout>,
}

/// Full layout of one sheet version.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetLayout {
    pub version: &'static str,
    pub owner_field: usize,
    pub sample_name_field: usize,
    pub material_field: usize,
    pub sessions: Vec<SessionLayout>,
}

impl SheetLayout {
    /// The layout of the TRaIL summary table used since 2021.
    pub fn trail_2021() -> Self {
        Self {
            version: "trail-2021",
            owner_field: OWNER_FIELD,
            sample_name_field: SAMPLE_NAME_FIELD,
            material_field: MATERIAL_FIELD,
            sessions: vec![
                SessionLayout {
                    technique: "Grain morphology",
                    instrument: Some("Optical microscope"),
                    analyses: vec![
                        AnalysisLayout {
                            analysis_type: "Grain shape",
                            slices: vec![
                                FieldSlice::Range(SHAPE_RANGE),
                                FieldSlice::From(GRAIN_NOTES_START),
                            ],
                        },
                        AnalysisLayout {
                            analysis_type: "Calculated grain data",
                            slices: vec![FieldSlice::Range(DERIVED_RANGE)],
                        },
                    ],
                },
                SessionLayout {
                    technique: "Trace element analysis",
                    instrument: Some("ICP-MS"),
                    analyses: vec![AnalysisLayout {
                        analysis_type: "Element data",
                        slices: vec![FieldSlice::Range(ELEMENT_RANGE)],
                    }],
                },
                SessionLayout {
                    technique: "(U+Th)/He thermochronology",
                    instrument: None,
                    analyses: vec![
                        AnalysisLayout {
                            analysis_type: "Raw date",
                            slices: vec![FieldSlice::Range(RAW_DATE_RANGE)],
                        },
                        AnalysisLayout {
                            analysis_type: "Corrected date",
                            slices: vec![FieldSlice::Range(CORRECTED_DATE_RANGE)],
                        },
                    ],
                },
            ],
        }
    }

    /// Look up the layout for a spec version tag.
    pub fn for_version(version: &str) -> SpecResult<Self> {
        match version {
            "trail-2021" => Ok(Self::trail_2021()),
            other => Err(SpecError::UnsupportedVersion(other.to_string())),
        }
    }

    /// Minimum number of clean fields a row must have.
    pub fn required_fields(&self) -> usize {
        let slices = self
            .sessions
            .iter()
            .flat_map(|s| &s.analyses)
            .flat_map(|a| &a.slices)
            .map(FieldSlice::required_len);
        slices
            .chain([self.owner_field + 1, self.sample_name_field + 1, self.material_field + 1])
            .max()
            .unwrap_or(0)
    }

    /// Fail if the column spec retains too few fields for this layout.
    pub fn check(&self, spec: &ColumnSpecTable) -> SpecResult<()> {
        let required = self.required_fields();
        let available = spec.retained_len();
        if available < required {
            return Err(SpecError::LayoutMismatch {
                version: self.version.to_string(),
                required,
                available,
            });
        }
        Ok(())
    }

    /// Mineral name of a row, if present as text.
    pub fn material(&self, fields: &[CleanField]) -> Option<String> {
        fields
            .get(self.material_field)
            .and_then(|f| f.text())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}
