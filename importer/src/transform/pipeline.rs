//! High-level import API: sheet in, samples out.
//!
//! This module combines all steps: spec and layout checks, project grouping,
//! per-row transformation, validation and persistence.
//!
//! ```text
//! Table ──▶ check spec ──▶ group by owner ──▶ per row:
//!                                             empty?   ──▶ skip
//!                                             no grain ──▶ parent Sample
//!                                             grain    ──▶ resolve ▶ link ▶ normalize ▶ layout ▶ Sample
//!                                                                                          │
//!                                              ImportReport ◀── sink ◀── validate ◀────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use trail_import::{import_file, ImportOptions, RecordStore};
//! use std::path::Path;
//!
//! let mut store = RecordStore::with_dir("records");
//! let report = import_file(Path::new("Data_Reduction_Sheet.csv"), &ImportOptions::default(), &mut store)?;
//! println!("{}", report.summary());
//! ```

use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::path::Path;

use super::assembler::create_analysis;
use super::grouper::{group_projects, is_empty_row};
use super::layout::SheetLayout;
use super::linker::link_errors;
use super::normalizer::{CleanField, Normalizer};
use super::resolver::{Resolution, SpecResolver, UnitPattern};
use super::spec::ColumnSpecTable;
use super::warning::Warning;
use crate::config::ImportOptions;
use crate::error::{ImportError, ImportResult};
use crate::logs::{
    log_info, log_info_indent, log_row_error, log_success, log_warning, log_warning_indent,
};
use crate::models::{Instrument, Project, Sample, Session, Target, Technique};
use crate::parser::{parse_file_auto, Row, Table, OWNER_COLUMN, SAMPLE_NAME_COLUMN};
use crate::sink::{RecordHandle, SampleSink};
use crate::validation::validate_sample;

// =============================================================================
// Report
// =============================================================================

/// Outcome of an import run.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Number of owners (projects) found
    pub projects: usize,
    /// Data rows in the sheet
    pub rows_total: usize,
    /// Samples handed to the sink, parents included
    pub imported: usize,
    /// Of which bare parent samples
    pub parents: usize,
    /// Rows skipped as mostly empty
    pub skipped_empty: usize,
    /// Rows with no owner
    pub skipped_no_owner: usize,
    /// Samples the sink already held (without redo)
    pub already_present: usize,
    /// Rows that failed validation or persistence
    pub failed: usize,
    /// Distinct warnings, in order of first occurrence
    pub warnings: Vec<Warning>,
    /// Persisted samples with their handles
    pub records: Vec<(String, RecordHandle)>,
}

impl ImportReport {
    /// Whether every row was either imported or skipped on purpose.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// One-line summary of the run.
    pub fn summary(&self) -> String {
        format!(
            "{} rows: {} imported ({} parents), {} already present, {} empty, {} without owner, {} failed, {} warnings",
            self.rows_total,
            self.imported,
            self.parents,
            self.already_present,
            self.skipped_empty,
            self.skipped_no_owner,
            self.failed,
            self.warnings.len()
        )
    }
}

/// Collects warnings once per distinct occurrence.
#[derive(Debug, Default)]
struct WarningLog {
    seen: HashSet<Warning>,
    ordered: Vec<Warning>,
    verbose: bool,
}

impl WarningLog {
    fn new(verbose: bool) -> Self {
        Self {
            verbose,
            ..Default::default()
        }
    }

    fn record(&mut self, warning: Warning) {
        if !self.seen.insert(warning.clone()) {
            return;
        }
        if self.verbose || !warning.is_verbose_only() {
            log_warning_indent(warning.to_string(), 1);
        }
        self.ordered.push(warning);
    }

    fn extend(&mut self, warnings: impl IntoIterator<Item = Warning>) {
        for w in warnings {
            self.record(w);
        }
    }
}

// =============================================================================
// Row transformation
// =============================================================================

/// Turns one sheet row into a grain sample.
pub struct RowTransformer<'a> {
    resolver: SpecResolver<'a>,
    normalizer: Normalizer,
    layout: &'a SheetLayout,
    session_date: NaiveDateTime,
}

impl<'a> RowTransformer<'a> {
    pub fn new(
        resolver: SpecResolver<'a>,
        normalizer: Normalizer,
        layout: &'a SheetLayout,
        session_date: NaiveDateTime,
    ) -> Self {
        Self {
            resolver,
            normalizer,
            layout,
            session_date,
        }
    }

    /// Resolve, link and normalize a row.
    pub fn clean_fields(&self, row: &Row) -> (Vec<CleanField>, Vec<Warning>) {
        let Resolution {
            columns,
            mut warnings,
        } = self.resolver.resolve(row);
        let (fields, normalize_warnings) = self.normalizer.normalize(link_errors(columns));
        warnings.extend(normalize_warnings);
        (fields, warnings)
    }

    /// One session per layout session, with its analyses.
    pub fn sessions(&self, fields: &[CleanField], target: Option<&str>) -> Vec<Session> {
        self.layout
            .sessions
            .iter()
            .map(|session| Session {
                date: self.session_date,
                technique: Technique {
                    id: session.technique.to_string(),
                },
                instrument: session.instrument.map(|name| Instrument {
                    name: name.to_string(),
                }),
                target: target.map(|id| Target { id: id.to_string() }),
                analysis: session
                    .analyses
                    .iter()
                    .map(|a| create_analysis(a.analysis_type, &a.collect(fields)))
                    .collect(),
            })
            .collect()
    }

    /// Full grain sample, member of `parent`.
    pub fn build_grain(
        &self,
        row: &Row,
        name: &str,
        parent: &str,
        project: &Project,
    ) -> (Sample, Vec<Warning>) {
        let (fields, warnings) = self.clean_fields(row);
        let material = self.layout.material(&fields);

        let mut sample = Sample::new(name, project.clone())
            .member_of(parent)
            .with_material(material.clone());
        for session in self.sessions(&fields, material.as_deref()) {
            sample.add_session(session);
        }
        (sample, warnings)
    }
}

// =============================================================================
// Import
// =============================================================================

enum RowOutcome {
    Imported(RecordHandle),
    AlreadyPresent,
}

/// Validate, show and persist one sample.
fn load_row<S: SampleSink + ?Sized>(
    sample: &Sample,
    options: &ImportOptions,
    sink: &mut S,
) -> Result<RowOutcome, String> {
    if !options.redo && sink.contains(&sample.name) {
        return Ok(RowOutcome::AlreadyPresent);
    }

    if !options.skip_validation || options.show_data {
        let json = serde_json::to_value(sample).map_err(|e| e.to_string())?;
        if options.show_data {
            let pretty = serde_json::to_string_pretty(&json).map_err(|e| e.to_string())?;
            println!("{}", pretty);
        }
        if !options.skip_validation {
            validate_sample(&json).map_err(|errs| errs.join("; "))?;
        }
    }

    sink.load_sample(sample)
        .map(RowOutcome::Imported)
        .map_err(|e| e.to_string())
}

/// Import a parsed sheet into `sink`.
///
/// A column-count mismatch between the sheet and the specification aborts
/// before any row is touched. Per-row failures are counted, unless
/// `stop_on_error` is set, in which case the first one aborts the run.
pub fn import_table<S: SampleSink + ?Sized>(
    table: &Table,
    spec: &ColumnSpecTable,
    options: &ImportOptions,
    sink: &mut S,
) -> ImportResult<ImportReport> {
    spec.check_columns(table.column_count())?;
    let layout = SheetLayout::for_version(spec.version())?;
    layout.check(spec)?;
    table.require_columns(&[OWNER_COLUMN, SAMPLE_NAME_COLUMN])?;
    let session_date = options.session_datetime()?;

    log_info(format!(
        "📋 Column spec '{}': {} columns, {} retained",
        spec.version(),
        spec.len(),
        spec.retained_len()
    ));
    log_info(format!("Missing values: {}", options.missing_policy));

    let units = UnitPattern::default();
    let transformer = RowTransformer::new(
        SpecResolver::new(spec, &units),
        Normalizer::new(options.missing_policy),
        &layout,
        session_date,
    );

    let mut report = ImportReport {
        rows_total: table.rows.len(),
        ..Default::default()
    };
    let mut warnings = WarningLog::new(options.verbose);

    let grouping = group_projects(table);
    report.projects = grouping.projects.len();
    report.skipped_no_owner = grouping.without_owner.len();
    if !grouping.without_owner.is_empty() {
        log_warning(format!(
            "{} rows without owner skipped",
            grouping.without_owner.len()
        ));
    }

    for group in &grouping.projects {
        log_info(format!("📦 {}", group.project.name));

        for grouped in &group.rows {
            // Sheet row number; the header is row 1
            let row_number = grouped.index + 2;

            if is_empty_row(grouped.row, table.column_count()) {
                report.skipped_empty += 1;
                continue;
            }

            let sample = match &grouped.grain.grain {
                None => Sample::new(grouped.full_name.as_str(), group.project.clone()),
                Some(_) => {
                    let (sample, row_warnings) = transformer.build_grain(
                        grouped.row,
                        &grouped.full_name,
                        &grouped.grain.sample_name,
                        &group.project,
                    );
                    warnings.extend(row_warnings);
                    sample
                }
            };

            match load_row(&sample, options, sink) {
                Ok(RowOutcome::Imported(handle)) => {
                    report.imported += 1;
                    if sample.is_parent() {
                        report.parents += 1;
                    }
                    log_info_indent(format!("{} → {}", sample.name, handle), 1);
                    report.records.push((sample.name, handle));
                }
                Ok(RowOutcome::AlreadyPresent) => {
                    report.already_present += 1;
                    log_info_indent(format!("{} already imported", sample.name), 1);
                }
                Err(message) => {
                    report.failed += 1;
                    log_row_error(row_number, format!("{}: {}", sample.name, message));
                    if options.stop_on_error {
                        return Err(ImportError::Aborted {
                            row: row_number,
                            message,
                        });
                    }
                }
            }
        }
    }

    report.warnings = warnings.ordered;
    if report.is_clean() {
        log_success(report.summary());
    } else {
        log_warning(report.summary());
    }
    Ok(report)
}

/// Parse a sheet file and import it.
pub fn import_file<S: SampleSink + ?Sized>(
    path: &Path,
    options: &ImportOptions,
    sink: &mut S,
) -> ImportResult<ImportReport> {
    log_info(format!("📖 Reading {}", path.display()));
    let table = parse_file_auto(path)?;
    log_success(format!("Detected encoding: {}", table.encoding));
    log_success(format!(
        "Read {} rows, {} columns",
        table.rows.len(),
        table.column_count()
    ));

    let spec = options.load_spec()?;
    import_table(&table, &spec, options, sink)
}
