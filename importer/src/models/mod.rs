//! Domain models for the reduction-sheet import pipeline.
//!
//! This module contains the data structures that flow out of the pipeline,
//! shaped like the nested records the Sparrow import schema accepts:
//!
//! - [`CellValue`] - One raw spreadsheet cell (number, text or missing)
//! - [`Project`] - Grouping of samples by owner
//! - [`Sample`] - A physical sample or grain, optionally member of a parent
//! - [`Session`] - One technique/instrument application against a sample
//! - [`Analysis`] - Named group of [`Datum`] and [`Attribute`] entries
//! - [`Datum`] - Numeric measurement with optional uncertainty and [`DatumType`]
//! - [`Attribute`] - Categorical/descriptive measurement

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Cell Values
// =============================================================================

/// A raw cell value as read from the sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Numeric cell.
    Number(f64),
    /// Textual cell.
    Text(String),
    /// Empty cell or the sheet's not-a-number marker.
    Missing,
}

impl CellValue {
    /// Parse a textual cell the way the spreadsheet export presents it.
    ///
    /// Empty strings and the usual spreadsheet NA markers become
    /// [`CellValue::Missing`]; anything that parses as a float becomes a number.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_MARKERS.contains(&trimmed) {
            return CellValue::Missing;
        }
        match trimmed.parse::<f64>() {
            // `f64` parsing accepts "NAN", "+nan" and other spellings
            Ok(n) if n.is_nan() => CellValue::Missing,
            Ok(n) => CellValue::Number(n),
            Err(_) => CellValue::Text(trimmed.to_string()),
        }
    }

    /// Missing cell. A NaN number counts, whoever produced it.
    pub fn is_missing(&self) -> bool {
        match self {
            CellValue::Missing => true,
            CellValue::Number(n) => n.is_nan(),
            CellValue::Text(_) => false,
        }
    }

    /// Numeric view of the cell. Text counts when it parses as a float; NaN never does.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Missing => None,
        };
        n.filter(|n| !n.is_nan())
    }

    /// Whether `self` equals a categorical lookup key.
    ///
    /// Numbers compare numerically so that `1` in a column spec matches a cell the
    /// spreadsheet stored as `1.0`.
    pub fn matches_key(&self, key: &CellValue) -> bool {
        match (self.as_number(), key.as_number()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => match (self, key) {
                (CellValue::Text(a), CellValue::Text(b)) => a.trim() == b.trim(),
                (CellValue::Missing, CellValue::Missing) => true,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Missing => Ok(()),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// Markers the spreadsheet export uses for "no value".
pub const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>", "NA",
    "NULL", "NaN", "nan", "null",
];

// =============================================================================
// Project
// =============================================================================

/// A project groups the samples of one owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
}

impl Project {
    /// Display name embedding the number of rows of the owner.
    pub fn for_owner(owner: &str, row_count: usize) -> Self {
        Self {
            name: format!("{} – {} samples", owner, row_count),
        }
    }
}

// =============================================================================
// Measurements
// =============================================================================

/// Type metadata of a [`Datum`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatumType {
    pub parameter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_computed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_interpreted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A numeric measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Datum {
    pub value: f64,
    /// Absent means the uncertainty was not measured, not that it is zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
    #[serde(rename = "type")]
    pub datum_type: DatumType,
}

/// A categorical or descriptive measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub parameter: String,
    pub value: String,
}

/// A named group of measurements produced by one step of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub analysis_type: String,
    pub datum: Vec<Datum>,
    pub attribute: Vec<Attribute>,
}

impl Analysis {
    /// Total number of entries in the analysis.
    pub fn len(&self) -> usize {
        self.datum.len() + self.attribute.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find a datum by parameter name.
    pub fn datum(&self, parameter: &str) -> Option<&Datum> {
        self.datum.iter().find(|d| d.datum_type.parameter == parameter)
    }

    /// Find an attribute by parameter name.
    pub fn attribute(&self, parameter: &str) -> Option<&Attribute> {
        self.attribute.iter().find(|a| a.parameter == parameter)
    }
}

// =============================================================================
// Sessions and Samples
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
}

/// The material a session was run against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
}

/// One technique/instrument session for a grain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub date: NaiveDateTime,
    pub technique: Technique,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<Instrument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    pub analysis: Vec<Analysis>,
}

impl Session {
    /// Find an analysis by type.
    pub fn analysis(&self, analysis_type: &str) -> Option<&Analysis> {
        self.analysis.iter().find(|a| a.analysis_type == analysis_type)
    }
}

/// Reference to an existing sample, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRef {
    pub name: String,
}

/// A physical sample or grain.
///
/// Grain-less rows produce a bare parent sample with no sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub project: Vec<Project>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_of: Option<SampleRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub session: Vec<Session>,
}

impl Sample {
    /// Create a bare sample with no sessions.
    pub fn new(name: impl Into<String>, project: Project) -> Self {
        Self {
            name: name.into(),
            project: vec![project],
            material: None,
            member_of: None,
            session: Vec::new(),
        }
    }

    /// Mark the sample as a grain of `parent`.
    pub fn member_of(mut self, parent: impl Into<String>) -> Self {
        self.member_of = Some(SampleRef {
            name: parent.into(),
        });
        self
    }

    pub fn with_material(mut self, material: Option<String>) -> Self {
        self.material = material;
        self
    }

    pub fn add_session(&mut self, session: Session) {
        self.session.push(session);
    }

    /// Whether the sample is a bare parent (no sessions).
    pub fn is_parent(&self) -> bool {
        self.session.is_empty()
    }

    /// Find a session by technique id.
    pub fn session(&self, technique: &str) -> Option<&Session> {
        self.session.iter().find(|s| s.technique.id == technique)
    }
}

// =============================================================================
// Tests
// =============================================================================
