//! # TRaIL import - (U+Th)/He data reduction sheets to Sparrow samples
//!
//! Reads the "Complete Summary Table" of the TRaIL data reduction workbook
//! (exported as CSV) and turns every row into a nested sample record, driven
//! by a declarative column specification.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────┐     ┌─────────────┐
//! │  CSV Sheet  │────▶│   Parser    │────▶│  Transform   │────▶│    Sink     │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (column spec)│     │ (JSON store)│
//! └─────────────┘     └─────────────┘     └──────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trail_import::{import_file, ImportOptions, RecordStore};
//!
//! let mut store = RecordStore::new();
//! let report = import_file("Data_Reduction_Sheet.csv".as_ref(), &ImportOptions::default(), &mut store)?;
//! println!("{}", report.summary());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Sample, session, analysis and datum records
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Column spec, row transformation and pipeline
//! - [`validation`] - Sample schema validation
//! - [`sink`] - Persistence sinks
//! - [`config`] - Import options
//! - [`logs`] - Import diagnostics

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Persistence
pub mod sink;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, ImportError, ImportResult, SinkError, SinkResult, SpecError, SpecResult,
    TableError, TableResult,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Analysis, Attribute, CellValue, Datum, DatumType, Instrument, Project, Sample, SampleRef,
    Session, Target, Technique,
};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{default_sheet_path, ImportOptions, DEFAULT_SESSION_DATE};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{is_valid, is_valid_sample, validate, validate_sample};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_file_auto,
    parse_table, Row, Table, OWNER_COLUMN, SAMPLE_NAME_COLUMN,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    create_analysis, group_projects, link_errors, split_grain_information, ColumnRule,
    ColumnSpecTable, MissingValuePolicy, SheetLayout, SpecResolver, UnitPattern, Warning,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{import_file, import_table, ImportReport, RowTransformer};

// =============================================================================
// Re-exports - Sinks
// =============================================================================

pub use sink::{MemorySink, RecordHandle, RecordStore, SampleSink, StoredRecord};
