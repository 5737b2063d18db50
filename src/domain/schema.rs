//! The feature schema shared by training and every inference site.
//!
//! The schema is produced once by the encoder, embedded in every model
//! artifact, and checked again wherever rows are scored. Column names follow
//! the `{Field}_{Category}` convention for one-hot indicators.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Bumped whenever the on-disk schema layout changes.
pub const SCHEMA_VERSION: u32 = 1;

/// A categorical field and the categories it was encoded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalField {
    pub name: String,
    /// The dropped category: all indicators of this field are 0 for it.
    pub baseline: String,
    /// Every category seen at encoding time, sorted, baseline first.
    pub categories: Vec<String>,
}

impl CategoricalField {
    /// Categories that received an indicator column.
    pub fn encoded_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(move |c| **c != self.baseline)
            .map(String::as_str)
    }

    pub fn indicator_columns(&self) -> Vec<String> {
        self.encoded_categories()
            .map(|c| indicator_name(&self.name, c))
            .collect()
    }
}

/// Ordered feature columns (label excluded) plus the metadata needed to
/// translate raw categorical inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub label: String,
    pub columns: Vec<String>,
    /// Numeric passthrough fields, in column order.
    pub numeric: Vec<String>,
    pub categorical: Vec<CategoricalField>,
}

impl FeatureSchema {
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn categorical_field(&self, name: &str) -> Option<&CategoricalField> {
        self.categorical.iter().find(|f| f.name == name)
    }

    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|n| n == name)
    }

    /// Fail unless `columns` is exactly this schema's column list.
    pub fn ensure_matches(&self, columns: &[String]) -> Result<(), AppError> {
        if self.version != SCHEMA_VERSION {
            return Err(AppError::schema(format!(
                "schema version {} is not supported (expected {SCHEMA_VERSION})",
                self.version
            )));
        }
        if columns == self.columns.as_slice() {
            return Ok(());
        }

        let first_diff = self
            .columns
            .iter()
            .zip(columns.iter())
            .position(|(a, b)| a != b);

        let detail = match first_diff {
            Some(i) => format!(
                "first difference at position {i}: expected `{}`, found `{}`",
                self.columns[i], columns[i]
            ),
            None => "column lists differ in length only".to_string(),
        };

        Err(AppError::schema(format!(
            "expected {} feature columns, found {}; {detail}",
            self.columns.len(),
            columns.len()
        )))
    }
}

/// Column name of the indicator for `category` of `field`.
pub fn indicator_name(field: &str, category: &str) -> String {
    format!("{field}_{category}")
}
