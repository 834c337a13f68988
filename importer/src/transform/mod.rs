//! Transformation module.
//!
//! This module handles sheet rows to sample records, leaves first:
//! - Spec: Column specification loading
//! - Resolver: Header checks and unit extraction
//! - Linker: Uncertainty columns attached to value columns
//! - Normalizer: Missing-value policy and categorical values
//! - Assembler: Clean fields to analyses
//! - Layout: Versioned field slices and sessions
//! - Grouper: Projects, empty rows and grain identity
//! - Pipeline: Main import pipeline

pub mod assembler;
pub mod grouper;
pub mod layout;
pub mod linker;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod spec;
pub mod warning;

pub use assembler::{create_analysis, create_attribute, create_datum, split_attributes};
pub use grouper::{group_projects, is_empty_row, split_grain_information, GrainInfo, EMPTY_ROW_THRESHOLD};
pub use layout::SheetLayout;
pub use linker::{link_errors, LinkedField};
pub use normalizer::{CleanField, MissingValuePolicy, Normalizer};
pub use pipeline::*;
pub use resolver::{ResolvedColumn, SpecResolver, UnitPattern};
pub use spec::{ColumnRule, ColumnSpecTable};
pub use warning::Warning;
