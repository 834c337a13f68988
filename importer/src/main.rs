//! trail-import CLI - Import TRaIL data reduction sheets
//!
//! # Main Commands
//!
//! ```bash
//! trail-import import sheet.csv          # Import into the record store
//! trail-import import                    # Uses $SPARROW_DATA_DIR/Data_Reduction_Sheet.csv
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! trail-import parse sheet.csv           # Just parse the sheet to JSON
//! trail-import check-spec sheet.csv      # Check a sheet against the column spec
//! trail-import show-spec                 # Show the column spec rules
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use trail_import::{
    default_sheet_path, import_file, parse_file_auto, ImportOptions, MemorySink,
    MissingValuePolicy, RecordStore, SheetLayout, UnitPattern,
};

#[derive(Parser)]
#[command(name = "trail-import")]
#[command(about = "Import TRaIL (U+Th)/He data reduction sheets as Sparrow samples", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a data reduction sheet
    Import {
        /// Input CSV file (default: $SPARROW_DATA_DIR/Data_Reduction_Sheet.csv)
        input: Option<PathBuf>,

        /// Column specification file (bundled spec if not specified)
        #[arg(short, long)]
        spec: Option<PathBuf>,

        /// Directory of the record store
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Missing values: unset, zero or not-available
        #[arg(long)]
        missing_policy: Option<MissingValuePolicy>,

        /// Date given to every session (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        session_date: Option<String>,

        /// Re-import samples already in the store
        #[arg(long)]
        redo: bool,

        /// Abort on the first failing row
        #[arg(long)]
        stop_on_error: bool,

        /// Skip validation
        #[arg(long)]
        no_validate: bool,

        /// Do not write anything
        #[arg(long)]
        dry_run: bool,

        /// Show verbose-only warnings
        #[arg(short, long)]
        verbose: bool,

        /// Print every assembled sample
        #[arg(short = 'S', long)]
        show_data: bool,
    },

    /// Parse a sheet and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a sheet against the column specification
    CheckSpec {
        /// Input CSV file
        input: PathBuf,

        /// Column specification file (bundled spec if not specified)
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },

    /// Show the column specification rules
    ShowSpec {
        /// Column specification file (bundled spec if not specified)
        #[arg(short, long)]
        spec: Option<PathBuf>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import {
            input,
            spec,
            output_dir,
            missing_policy,
            session_date,
            redo,
            stop_on_error,
            no_validate,
            dry_run,
            verbose,
            show_data,
        } => ImportOptions::from_env()
            .map_err(|e| e.into())
            .and_then(|mut options| {
                if spec.is_some() {
                    options.spec_path = spec;
                }
                if let Some(policy) = missing_policy {
                    options.missing_policy = policy;
                }
                if let Some(date) = session_date {
                    options.session_date = date;
                }
                options.redo = redo;
                options.stop_on_error = stop_on_error;
                options.skip_validation = no_validate;
                options.verbose = verbose;
                options.show_data = show_data;
                cmd_import(input, &options, output_dir.as_deref(), dry_run)
            }),

        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),

        Commands::CheckSpec { input, spec } => cmd_check_spec(&input, spec),

        Commands::ShowSpec { spec } => cmd_show_spec(spec),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_import(
    input: Option<PathBuf>,
    options: &ImportOptions,
    output_dir: Option<&Path>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let input = input
        .or_else(default_sheet_path)
        .ok_or("No input sheet given and SPARROW_DATA_DIR is not set")?;

    let report = if dry_run {
        eprintln!("🧪 Dry run: nothing will be written");
        import_file(&input, options, &mut MemorySink::new())?
    } else {
        let mut store = match output_dir {
            Some(dir) => RecordStore::with_dir(dir),
            None => RecordStore::new(),
        };
        eprintln!("💾 Record store: {}", store.dir().display());
        import_file(&input, options, &mut store)?
    };

    if !report.is_clean() {
        eprintln!("⚠️  {} rows failed", report.failed);
        std::process::exit(1);
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing sheet: {}", input.display());

    let table = parse_file_auto(input)?;
    eprintln!("   Encoding: {}", table.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(table.delimiter));
    eprintln!("   Columns: {}", table.column_count());
    eprintln!("✅ Parsed {} rows", table.rows.len());

    let json = serde_json::to_string_pretty(&table.rows_as_json())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_check_spec(input: &Path, spec: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let options = ImportOptions {
        spec_path: spec,
        ..Default::default()
    };
    let spec = options.load_spec()?;
    let table = parse_file_auto(input)?;

    eprintln!("🔍 Checking {} against spec '{}'", input.display(), spec.version());
    spec.check_columns(table.column_count())?;
    eprintln!("   ✅ {} columns", spec.len());

    let layout = SheetLayout::for_version(spec.version())?;
    layout.check(&spec)?;
    eprintln!(
        "   ✅ {} retained fields (layout needs {})",
        spec.retained_len(),
        layout.required_fields()
    );

    let mismatches = spec.header_mismatches(&table.headers);
    for (index, declared, actual) in &mismatches {
        eprintln!("   ⚠️  [{:2}] expected '{}', found '{}'", index, declared, actual);
    }
    if mismatches.is_empty() {
        eprintln!("   ✅ All headers match");
    }

    Ok(())
}

fn cmd_show_spec(spec: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let options = ImportOptions {
        spec_path: spec,
        ..Default::default()
    };
    let spec = options.load_spec()?;
    let units = UnitPattern::default();

    println!("📋 Column spec '{}' ({} columns)\n", spec.version(), spec.len());
    for (index, rule) in spec.rules().iter().enumerate() {
        let header = rule.header.as_deref().unwrap_or("±");
        let role = if rule.skip {
            "skipped".to_string()
        } else if rule.is_error_column() {
            let targets: Vec<String> = rule.error_for.iter().map(|t| t.to_string()).collect();
            format!("error for [{}]", targets.join(", "))
        } else {
            match units.split(header) {
                Some((param, unit)) => format!("{} [{}]", param, unit),
                None => header.to_string(),
            }
        };
        println!("  [{:2}] {:<28} {}", index, header, role);
    }

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
