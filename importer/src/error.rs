//! Error types for the reduction-sheet import pipeline.
//!
//! Errors are layered the same way the pipeline is:
//!
//! - [`SpecError`] - Column specification loading and checking
//! - [`TableError`] - Reading the exported sheet into a table
//! - [`SinkError`] - Persisting assembled samples
//! - [`ConfigError`] - Invalid import options
//! - [`ImportError`] - Top-level orchestration errors
//!
//! Conversion is automatic via `From` implementations, so `?` works across
//! layer boundaries. Per-cell anomalies are not errors at all: they are
//! [`crate::transform::Warning`] values that travel with the results.

use thiserror::Error;

// =============================================================================
// Column Specification Errors
// =============================================================================

/// Errors while loading or checking the column specification.
#[derive(Debug, Error)]
pub enum SpecError {
    /// Failed to read the specification file.
    #[error("Failed to read column spec: {0}")]
    Io(#[from] std::io::Error),

    /// The specification is not valid YAML or has an unexpected shape.
    #[error("Invalid column spec YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A single rule could not be interpreted.
    #[error("Invalid rule for column {index}: {message}")]
    InvalidRule { index: usize, message: String },

    /// An error column points at itself or at a later column.
    #[error("Column {index} is an error column for column {target}, which does not precede it")]
    ForwardErrorReference { index: usize, target: i64 },

    /// Specification length differs from the sheet's column count.
    #[error("Column spec has {expected} entries but the sheet has {actual} columns")]
    Mismatch { expected: usize, actual: usize },

    /// No sheet layout is known for this specification version.
    #[error("Unsupported column spec version: {0}")]
    UnsupportedVersion(String),

    /// The specification retains fewer fields than the layout slices.
    #[error("Layout '{version}' needs at least {required} retained fields, spec provides {available}")]
    LayoutMismatch {
        version: String,
        required: usize,
        available: usize,
    },
}

// =============================================================================
// Table Errors
// =============================================================================

/// Errors while reading the exported sheet.
#[derive(Debug, Error)]
pub enum TableError {
    /// Failed to read file.
    #[error("Failed to read sheet: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the file contents.
    #[error("Failed to decode sheet: {0}")]
    Encoding(String),

    /// Malformed CSV.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Empty file.
    #[error("Sheet is empty")]
    EmptyFile,

    /// No header row.
    #[error("No headers found in sheet")]
    NoHeaders,

    /// A column the importer relies on is absent.
    #[error("Required column missing from sheet: {0}")]
    MissingColumn(String),
}

// =============================================================================
// Sink Errors
// =============================================================================

/// Errors from a persistence sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// IO error.
    #[error("Record store IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("Record store JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The sink refused the record.
    #[error("Record rejected: {0}")]
    Rejected(String),
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Invalid import options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unknown missing-value policy name.
    #[error("Unknown missing-value policy '{0}' (expected unset, zero or not-available)")]
    InvalidPolicy(String),

    /// Session date placeholder does not parse.
    #[error("Invalid session date '{value}': {message}")]
    InvalidDate { value: String, message: String },
}

// =============================================================================
// Import Errors (top-level)
// =============================================================================

/// Top-level import errors.
///
/// This is the error returned by [`crate::transform::pipeline::import_table`]
/// and [`crate::transform::pipeline::import_file`].
#[derive(Debug, Error)]
pub enum ImportError {
    /// Column specification error.
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    /// Sheet reading error.
    #[error("Table error: {0}")]
    Table(#[from] TableError),

    /// Sink error.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// A row failed while running with stop-on-error.
    #[error("Import aborted at row {row}: {message}")]
    Aborted { row: usize, message: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for column specification operations.
pub type SpecResult<T> = Result<T, SpecError>;

/// Result type for table operations.
pub type TableResult<T> = Result<T, TableError>;

/// Result type for sink operations.
pub type SinkResult<T> = Result<T, SinkError>;

/// Result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;
