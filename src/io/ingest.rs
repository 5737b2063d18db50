//! CSV ingest for raw and encoded tables.
//!
//! - raw customer exports are read as trimmed strings; type decisions are left
//!   to the encoder
//! - encoded tables must be fully numeric; any non-numeric cell is a hard error
//!   because the schema contract is already fixed at that point

use std::fs::File;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{EncodedTable, RawRow, RawTable, RowError};
use crate::error::AppError;

/// Raw table plus the records the CSV reader itself could not parse.
#[derive(Debug, Clone)]
pub struct RawIngest {
    pub table: RawTable,
    pub row_errors: Vec<RowError>,
}

/// Read a raw CSV with a header row.
pub fn read_raw_table(path: &Path) -> Result<RawIngest, AppError> {
    let file = open(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = read_headers(&mut reader, path)?;
    let width = headers.len();

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        match result {
            Ok(record) if record.len() == width => rows.push(RawRow {
                line,
                cells: record.iter().map(str::to_string).collect(),
            }),
            Ok(record) => row_errors.push(RowError {
                line,
                id: record.get(0).map(str::to_string),
                message: format!("expected {width} fields, found {}", record.len()),
            }),
            Err(e) => row_errors.push(RowError {
                line,
                id: None,
                message: format!("CSV parse error: {e}"),
            }),
        }
    }

    Ok(RawIngest {
        table: RawTable { headers, rows },
        row_errors,
    })
}

/// Read an encoded (numeric-only) CSV whose label column is `label`.
pub fn read_encoded_table(path: &Path, label: &str) -> Result<EncodedTable, AppError> {
    let file = open(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let columns = read_headers(&mut reader, path)?;
    if !columns.iter().any(|c| c == label) {
        return Err(AppError::data(format!(
            "Encoded table '{}' has no label column `{label}`.",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::data(format!("{}:{line}: CSV parse error: {e}", path.display()))
        })?;
        let row = record
            .iter()
            .zip(columns.iter())
            .map(|(cell, column)| {
                parse_numeric_cell(cell).ok_or_else(|| {
                    AppError::data(format!(
                        "{}:{line}: column `{column}` is not numeric ('{cell}').",
                        path.display()
                    ))
                })
            })
            .collect::<Result<Vec<f64>, AppError>>()?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(AppError::data(format!(
            "Encoded table '{}' has no rows.",
            path.display()
        )));
    }

    Ok(EncodedTable {
        columns,
        label: label.to_string(),
        rows,
    })
}

fn open(path: &Path) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::data(format!("Failed to open CSV '{}': {e}", path.display())))
}

fn read_headers<R: std::io::Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<Vec<String>, AppError> {
    let headers: StringRecord = reader
        .headers()
        .map_err(|e| AppError::data(format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();
    if headers.is_empty() {
        return Err(AppError::data(format!("CSV '{}' has an empty header.", path.display())));
    }
    Ok(headers.iter().map(normalize_header_name).collect())
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

/// Numeric cell, also accepting the boolean spellings some dataframe tools
/// emit for indicator columns.
fn parse_numeric_cell(cell: &str) -> Option<f64> {
    match cell {
        "True" | "true" => Some(1.0),
        "False" | "false" => Some(0.0),
        _ => cell.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}
