//! Table source: the "Complete Summary Table" sheet exported as CSV.
//!
//! Rows keep their physical column order, duplicate headers included (a
//! reduction sheet has one `±` column per uncertainty). Encoding and delimiter
//! are auto-detected since the sheets come out of Excel on different machines.

use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{TableError, TableResult};
use crate::models::CellValue;

/// Column holding the owner of a row; rows are grouped into projects by it.
pub const OWNER_COLUMN: &str = "Owner";

/// Column holding the composite `<sample>-<grain>` name.
pub const SAMPLE_NAME_COLUMN: &str = "Full Sample Name";

/// One sheet row: ordered header → value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<(String, CellValue)>,
}

impl Row {
    /// Build a row from header/value pairs.
    pub fn new(cells: Vec<(String, CellValue)>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value of the first column called `header`.
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
    }

    /// Non-missing textual value of `header`.
    pub fn text(&self, header: &str) -> Option<String> {
        self.get(header)
            .filter(|v| !v.is_missing())
            .map(|v| v.to_string())
    }

    /// Number of missing cells.
    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|(_, v)| v.is_missing()).count()
    }

    /// JSON object view, for debugging output.
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        for (header, value) in &self.cells {
            // Duplicate headers: first one wins, as in a spreadsheet lookup
            if !obj.contains_key(header) {
                obj.insert(header.clone(), serde_json::to_value(value).unwrap_or(Value::Null));
            }
        }
        Value::Object(obj)
    }
}

/// A parsed sheet with metadata
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    /// Detected or used encoding
    pub encoding: String,
    /// Detected or used delimiter
    pub delimiter: char,
}

impl Table {
    /// Build a table from headers and rows of raw cells.
    ///
    /// Short rows are padded with missing cells, long rows truncated.
    pub fn from_cells(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|values| {
                let mut values = values.into_iter();
                let cells = headers
                    .iter()
                    .map(|h| (h.clone(), values.next().unwrap_or(CellValue::Missing)))
                    .collect();
                Row::new(cells)
            })
            .collect();
        Self {
            headers,
            rows,
            encoding: "utf-8".to_string(),
            delimiter: ',',
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Check that the columns the importer depends on are present.
    pub fn require_columns(&self, columns: &[&str]) -> TableResult<()> {
        for col in columns {
            if !self.headers.iter().any(|h| h == col) {
                return Err(TableError::MissingColumn(col.to_string()));
            }
        }
        Ok(())
    }

    /// All rows as JSON objects.
    pub fn rows_as_json(&self) -> Vec<Value> {
        self.rows.iter().map(Row::to_json).collect()
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> TableResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => enc.decode(bytes).0.to_string(),
            None => {
                return Err(TableError::Encoding(format!("unsupported encoding '{}'", other)));
            }
        },
    };
    // Excel writes a BOM in front of UTF-8 exports
    Ok(decoded.trim_start_matches('\u{feff}').to_string())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV text with an explicit delimiter.
///
/// # Example
/// ```ignore
/// let table = parse_table("Owner,Full Sample Name\nFlowers,AHe-01-1", ',', "utf-8".into())?;
/// assert_eq!(table.rows[0].text("Owner").as_deref(), Some("Flowers"));
/// ```
pub fn parse_table(content: &str, delimiter: char, encoding: String) -> TableResult<Table> {
    if content.trim().is_empty() {
        return Err(TableError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(TableError::NoHeaders);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::parse).collect::<Vec<_>>());
    }

    let mut table = Table::from_cells(headers, rows);
    table.encoding = encoding;
    table.delimiter = delimiter;
    Ok(table)
}

/// Parse sheet bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> TableResult<Table> {
    if bytes.is_empty() {
        return Err(TableError::EmptyFile);
    }
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_table(&content, delimiter, encoding)
}

/// Parse a sheet file with auto-detection of encoding and delimiter.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> TableResult<Table> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}
