//! Recipient table loading
//!
//! Each CSV row is resolved once into a [`RecipientRecord`]: the display name
//! and department are decided at ingestion, and every cell is typed as a
//! [`CellValue`] so template selection never has to look at raw strings.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::warn;

use crate::error::Result;

/// Column names the loader reads recipient details from
#[derive(Debug, Clone)]
pub struct ColumnNames {
    /// Name used when the alternate name is missing
    pub name: String,
    /// Preferred display name (e.g. a nickname)
    pub alternate_name: String,
    /// Optional department/group
    pub department: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Vorname".to_string(),
            alternate_name: "Ceviname".to_string(),
            department: "Abteilung".to_string(),
        }
    }
}

/// A typed CSV cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Empty cell, `nan`, or another missing marker such as `NA` or `NULL`
    Missing,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Type a raw cell
    pub fn parse(raw: &str) -> Self {
        let Some(raw) = present(raw) else {
            return CellValue::Missing;
        };

        match raw.parse::<f64>() {
            Ok(n) if n.is_finite() => CellValue::Number(n),
            _ => CellValue::Text(raw.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the cell selects a flag column
    pub fn is_truthy(&self) -> bool {
        match self {
            CellValue::Missing => false,
            CellValue::Number(n) => *n != 0.0,
            CellValue::Text(text) => {
                let text = text.to_lowercase();
                matches!(text.as_str(), "true" | "yes" | "ja" | "x" | "y" | "wahr")
            }
        }
    }
}

static MISSING: CellValue = CellValue::Missing;

/// Cell contents that spreadsheet exports use for "no value"
const MISSING_MARKERS: [&str; 14] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "1.#IND", "1.#QNAN", "<NA>", "N/A", "n/a",
    "NA", "NULL", "null", "None",
];

/// Trimmed cell content, or `None` for empty and missing-marker cells
fn present(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let nan = raw.strip_prefix('-').unwrap_or(raw).eq_ignore_ascii_case("nan");
    if raw.is_empty() || nan || MISSING_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw)
    }
}

/// Present value of a named column in a row
fn lookup<'a>(headers: &StringRecord, row: &'a StringRecord, column: &str) -> Option<&'a str> {
    headers
        .iter()
        .position(|h| h == column)
        .and_then(|i| row.get(i))
        .and_then(present)
}

/// One recipient row
#[derive(Debug, Clone)]
pub struct RecipientRecord {
    /// Zero-based data row index
    pub index: usize,
    /// Resolved display name
    pub name: String,
    /// Department, if the row has one
    pub department: Option<String>,
    cells: Vec<(String, CellValue)>,
}

impl RecipientRecord {
    /// Resolve a row against the header
    pub fn from_row(
        index: usize,
        headers: &StringRecord,
        row: &StringRecord,
        columns: &ColumnNames,
    ) -> Self {
        let raw = |column: &str| lookup(headers, row, column);

        let name = match raw(&columns.alternate_name).or_else(|| raw(&columns.name)) {
            Some(name) => name.to_string(),
            None => {
                warn!(
                    "Row {}: no value in '{}' or '{}'",
                    index + 1,
                    columns.alternate_name,
                    columns.name
                );
                String::new()
            }
        };

        let department = raw(&columns.department).map(str::to_string);

        let cells = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = row.get(i).map(CellValue::parse).unwrap_or(CellValue::Missing);
                (header.to_string(), value)
            })
            .collect();

        Self {
            index,
            name,
            department,
            cells,
        }
    }

    /// Build a record directly from its parts
    pub fn new(
        index: usize,
        name: impl Into<String>,
        department: Option<String>,
        cells: Vec<(String, CellValue)>,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            department,
            cells,
        }
    }

    /// Value of a column; `Missing` if the table has no such column
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .unwrap_or(&MISSING)
    }

    /// All cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (&str, &CellValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Read recipients from any CSV source
pub fn read_recipients<R: Read>(reader: R, columns: &ColumnNames) -> Result<Vec<RecipientRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();

    let mut recipients = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        recipients.push(RecipientRecord::from_row(index, &headers, &row, columns));
    }

    Ok(recipients)
}

/// Read recipients from a CSV file
pub fn load_recipients(path: &Path, columns: &ColumnNames) -> Result<Vec<RecipientRecord>> {
    let file = File::open(path)?;
    read_recipients(file, columns)
}
