//! Import options.
//!
//! Defaults can be overridden from the environment (a `.env` file is loaded
//! if present):
//!
//! | Variable               | Option              |
//! |------------------------|---------------------|
//! | `TRAIL_COLUMN_SPEC`    | `spec_path`         |
//! | `TRAIL_MISSING_POLICY` | `missing_policy`    |
//! | `TRAIL_SESSION_DATE`   | `session_date`      |
//! | `SPARROW_DATA_DIR`     | default input sheet |

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{ConfigError, SpecResult};
use crate::transform::normalizer::MissingValuePolicy;
use crate::transform::spec::ColumnSpecTable;

/// Placeholder date given to sessions; the sheet carries no analysis dates.
pub const DEFAULT_SESSION_DATE: &str = "2019-11-22T00:00:00";

/// Format of [`ImportOptions::session_date`].
pub const SESSION_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// File name of the reduction sheet inside the data directory.
pub const DEFAULT_SHEET_NAME: &str = "Data_Reduction_Sheet.csv";

/// Options for an import run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Column specification file; the bundled one when `None`
    pub spec_path: Option<PathBuf>,

    /// What to do with missing value cells
    pub missing_policy: MissingValuePolicy,

    /// Date given to every session
    pub session_date: String,

    /// Skip schema validation of assembled samples
    pub skip_validation: bool,

    /// Abort on the first row that fails
    pub stop_on_error: bool,

    /// Import samples the sink already holds
    pub redo: bool,

    /// Log verbose-only warnings
    pub verbose: bool,

    /// Print each assembled sample
    pub show_data: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            spec_path: None,
            missing_policy: MissingValuePolicy::default(),
            session_date: DEFAULT_SESSION_DATE.to_string(),
            skip_validation: false,
            stop_on_error: false,
            redo: false,
            verbose: false,
            show_data: false,
        }
    }
}

impl ImportOptions {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Try loading .env file
        let _ = dotenvy::dotenv();

        let mut options = Self::default();
        if let Ok(path) = env::var("TRAIL_COLUMN_SPEC") {
            options.spec_path = Some(PathBuf::from(path));
        }
        if let Ok(policy) = env::var("TRAIL_MISSING_POLICY") {
            options.missing_policy = policy.parse()?;
        }
        if let Ok(date) = env::var("TRAIL_SESSION_DATE") {
            options.session_date = date;
        }
        options.session_datetime()?;
        Ok(options)
    }

    /// Parsed session date.
    pub fn session_datetime(&self) -> Result<NaiveDateTime, ConfigError> {
        NaiveDateTime::parse_from_str(&self.session_date, SESSION_DATE_FORMAT).map_err(|e| {
            ConfigError::InvalidDate {
                value: self.session_date.clone(),
                message: e.to_string(),
            }
        })
    }

    /// Load the configured column specification.
    pub fn load_spec(&self) -> SpecResult<ColumnSpecTable> {
        match &self.spec_path {
            Some(path) => ColumnSpecTable::from_file(path),
            None => ColumnSpecTable::bundled(),
        }
    }
}

/// Default input sheet: `$SPARROW_DATA_DIR/Data_Reduction_Sheet.csv`.
pub fn default_sheet_path() -> Option<PathBuf> {
    let _ = dotenvy::dotenv();
    env::var("SPARROW_DATA_DIR")
        .ok()
        .map(|dir| PathBuf::from(dir).join(DEFAULT_SHEET_NAME))
}
