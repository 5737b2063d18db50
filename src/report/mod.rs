//! Reporting utilities: dataset snapshots and formatted terminal output.
//!
//! Formatting lives in one place so stage logic stays free of presentation
//! and output changes are localized.

pub mod format;

pub use format::*;

use crate::domain::EncodedTable;

/// Headline numbers of an encoded dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSnapshot {
    pub rows: usize,
    /// Feature columns, label excluded.
    pub features: usize,
    pub churn_rate: Option<f64>,
}

impl DatasetSnapshot {
    pub fn from_table(table: &EncodedTable) -> Self {
        Self {
            rows: table.n_rows(),
            features: table.feature_columns().len(),
            churn_rate: table.positive_rate(),
        }
    }
}
