//! CSV exports for the encoded dataset and the targeting list.
//!
//! Files are rendered into memory and then written atomically (temp file in
//! the same directory, then rename) so a reader never sees a partial file.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{EncodedTable, TargetingSelection};
use crate::error::AppError;

/// Columns appended to every encoded record in the targeting export.
pub const SCORE_COLUMNS: [&str; 3] = ["churn_prob", "expected_revenue", "expected_profit"];

/// Write the encoded table (schema columns + label) to CSV.
pub fn write_encoded_csv(path: &Path, table: &EncodedTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.columns)
        .map_err(|e| AppError::io(format!("Failed to write encoded CSV header: {e}")))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|v| format_value(*v)))
            .map_err(|e| AppError::io(format!("Failed to write encoded CSV row: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to flush encoded CSV: {e}")))?;
    write_atomic(path, &bytes)
}

/// Write the ranked and truncated targeting list to CSV.
pub fn write_targets_csv(path: &Path, selection: &TargetingSelection) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let header = selection
        .columns
        .iter()
        .map(String::as_str)
        .chain(SCORE_COLUMNS);
    writer
        .write_record(header)
        .map_err(|e| AppError::io(format!("Failed to write targets CSV header: {e}")))?;

    for c in &selection.customers {
        let fields = c
            .values
            .iter()
            .copied()
            .chain([c.churn_prob, c.expected_revenue, c.expected_profit])
            .map(format_value);
        writer
            .write_record(fields)
            .map_err(|e| AppError::io(format!("Failed to write targets CSV row: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::io(format!("Failed to flush targets CSV: {e}")))?;
    write_atomic(path, &bytes)
}

/// Shortest round-trip representation; integral values print without a dot.
pub fn format_value(v: f64) -> String {
    format!("{v}")
}

/// Write `bytes` to `path` via a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let tmp = temp_sibling(path);
    fs::write(&tmp, bytes)
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        AppError::io(format!("Failed to move '{}' into place: {e}", path.display()))
    })
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| AppError::io(format!("Failed to create directory '{}': {e}", parent.display()))),
        _ => Ok(()),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}
