//! Raw customer table → numeric feature table.
//!
//! Encoding rules:
//! - rows with a blank cell, an uncoercible numeric field or an unknown label
//!   are dropped and reported (no imputation)
//! - the identifier field is discarded
//! - the label maps `Yes → 1`, `No → 0`
//! - a field whose every surviving value parses as a number stays numeric;
//!   anything else is one-hot encoded
//! - categories are sorted lexically and the first one is the baseline, which
//!   gets no indicator column
//!
//! Column order: numeric fields (label included) in header order, then the
//! indicator columns of each categorical field in header order.

use std::collections::BTreeSet;

use tracing::debug;

use crate::domain::{
    CategoricalField, EncodedTable, FeatureSchema, RawTable, RowError, SCHEMA_VERSION, indicator_name,
};
use crate::error::AppError;

/// Field names and label spellings of the raw export.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub id_field: String,
    pub label_field: String,
    /// Fields that must parse as numbers; rows where they don't are dropped.
    pub coerce_fields: Vec<String>,
    pub positive_label: String,
    pub negative_label: String,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            id_field: "customerID".to_string(),
            label_field: "Churn".to_string(),
            coerce_fields: vec!["TotalCharges".to_string()],
            positive_label: "Yes".to_string(),
            negative_label: "No".to_string(),
        }
    }
}

/// Encoder output.
#[derive(Debug, Clone)]
pub struct Encoding {
    pub table: EncodedTable,
    pub schema: FeatureSchema,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

#[derive(Debug, Clone)]
enum ColumnPlan {
    Label,
    Numeric(usize),
    Indicator { source: usize, category: String },
}

/// Encode a raw table. See the module docs for the rules.
pub fn encode(raw: &RawTable, config: &EncoderConfig) -> Result<Encoding, AppError> {
    let id_idx = require_column(raw, &config.id_field)?;
    let label_idx = require_column(raw, &config.label_field)?;
    let coerce_idx = config
        .coerce_fields
        .iter()
        .map(|f| require_column(raw, f))
        .collect::<Result<Vec<usize>, AppError>>()?;

    let mut row_errors = Vec::new();
    let mut kept: Vec<(&[String], f64)> = Vec::with_capacity(raw.rows.len());

    for row in &raw.rows {
        let id = row.cells.get(id_idx).cloned();
        let reject = |message: String| RowError {
            line: row.line,
            id: id.clone(),
            message,
        };

        if let Some(j) = row.cells.iter().position(|c| c.is_empty()) {
            row_errors.push(reject(format!("blank value in `{}`", raw.headers[j])));
            continue;
        }
        if let Some(&j) = coerce_idx.iter().find(|&&j| parse_number(&row.cells[j]).is_none()) {
            row_errors.push(reject(format!(
                "`{}` is not numeric ('{}')",
                raw.headers[j], row.cells[j]
            )));
            continue;
        }

        let label_cell = &row.cells[label_idx];
        let label = if *label_cell == config.positive_label {
            1.0
        } else if *label_cell == config.negative_label {
            0.0
        } else {
            row_errors.push(reject(format!(
                "unrecognized `{}` value '{label_cell}'",
                config.label_field
            )));
            continue;
        };

        kept.push((row.cells.as_slice(), label));
    }

    if kept.is_empty() {
        return Err(AppError::data(format!(
            "No valid rows remain after encoding ({} read, {} rejected).",
            raw.rows.len(),
            row_errors.len()
        )));
    }

    let mut plan: Vec<(String, ColumnPlan)> = Vec::new();
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();
    let mut categorical_sources = Vec::new();

    for (j, header) in raw.headers.iter().enumerate() {
        if j == id_idx {
            continue;
        }
        if j == label_idx {
            plan.push((header.clone(), ColumnPlan::Label));
            continue;
        }

        let is_numeric =
            coerce_idx.contains(&j) || kept.iter().all(|(cells, _)| parse_number(&cells[j]).is_some());

        if is_numeric {
            plan.push((header.clone(), ColumnPlan::Numeric(j)));
            numeric.push(header.clone());
        } else {
            let categories: BTreeSet<&str> = kept.iter().map(|(cells, _)| cells[j].as_str()).collect();
            let categories: Vec<String> = categories.into_iter().map(str::to_string).collect();
            categorical.push(CategoricalField {
                name: header.clone(),
                baseline: categories[0].clone(),
                categories,
            });
            categorical_sources.push(j);
        }
    }

    for (field, &source) in categorical.iter().zip(categorical_sources.iter()) {
        for category in field.encoded_categories() {
            plan.push((
                indicator_name(&field.name, category),
                ColumnPlan::Indicator {
                    source,
                    category: category.to_string(),
                },
            ));
        }
        debug!(
            field = %field.name,
            baseline = %field.baseline,
            indicators = field.categories.len() - 1,
            "one-hot encoded field"
        );
    }

    let rows = kept
        .iter()
        .map(|(cells, label)| {
            plan.iter()
                .map(|(_, column)| match column {
                    ColumnPlan::Label => *label,
                    // Checked numeric above, so the fallback is unreachable in practice.
                    ColumnPlan::Numeric(j) => parse_number(&cells[*j]).unwrap_or(0.0),
                    ColumnPlan::Indicator { source, category } => {
                        if cells[*source] == *category {
                            1.0
                        } else {
                            0.0
                        }
                    }
                })
                .collect()
        })
        .collect();

    let columns: Vec<String> = plan.iter().map(|(name, _)| name.clone()).collect();
    let schema = FeatureSchema {
        version: SCHEMA_VERSION,
        label: config.label_field.clone(),
        columns: columns
            .iter()
            .filter(|c| **c != config.label_field)
            .cloned()
            .collect(),
        numeric,
        categorical,
    };

    Ok(Encoding {
        table: EncodedTable {
            columns,
            label: config.label_field.clone(),
            rows,
        },
        schema,
        row_errors,
        rows_read: raw.rows.len(),
    })
}

/// Recover the schema from an encoded table's header alone.
///
/// Categorical metadata is not recoverable from column names, so the result
/// treats every column as numeric. Used only for encoded files produced by
/// other tools; artifacts always carry the full schema.
pub fn schema_from_columns(table: &EncodedTable) -> FeatureSchema {
    let columns = table.feature_columns();
    FeatureSchema {
        version: SCHEMA_VERSION,
        label: table.label.clone(),
        numeric: columns.clone(),
        columns,
        categorical: Vec::new(),
    }
}

fn require_column(raw: &RawTable, name: &str) -> Result<usize, AppError> {
    raw.column_index(name)
        .ok_or_else(|| AppError::data(format!("Missing required column: `{name}`")))
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawRow;

    fn raw(rows: &[&[&str]]) -> RawTable {
        RawTable {
            headers: ["customerID", "tenure", "Contract", "TotalCharges", "Churn"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: rows
                .iter()
                .enumerate()
                .map(|(i, cells)| RawRow {
                    line: i + 2,
                    cells: cells.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    fn sample() -> RawTable {
        raw(&[
            &["a", "1", "Month-to-month", "29.85", "No"],
            &["b", "34", "One year", "1889.5", "No"],
            &["c", "2", "Month-to-month", "108.15", "Yes"],
            &["d", "45", "Two year", "1840.75", "No"],
            &["e", "0", "Two year", "", "No"],
            &["f", "8", "One year", "abc", "Yes"],
        ])
    }

    #[test]
    fn drops_identifier_and_maps_label() {
        let enc = encode(&sample(), &EncoderConfig::default()).unwrap();
        assert!(enc.table.column_index("customerID").is_none());
        assert_eq!(enc.table.columns.iter().filter(|c| *c == "Churn").count(), 1);
        assert_eq!(enc.table.labels().unwrap(), vec![0, 0, 1, 0]);
        assert!(!enc.schema.columns.contains(&"Churn".to_string()));
    }

    #[test]
    fn uncoercible_rows_are_dropped_and_reported() {
        let enc = encode(&sample(), &EncoderConfig::default()).unwrap();
        assert_eq!(enc.rows_read, 6);
        assert_eq!(enc.table.n_rows(), 4);
        let lines: Vec<usize> = enc.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![6, 7]);
        assert_eq!(enc.row_errors[0].id.as_deref(), Some("e"));
    }

    #[test]
    fn one_hot_has_k_minus_one_columns_and_sorted_baseline() {
        let enc = encode(&sample(), &EncoderConfig::default()).unwrap();
        assert_eq!(
            enc.table.columns,
            vec!["tenure", "TotalCharges", "Churn", "Contract_One year", "Contract_Two year"]
        );

        let field = enc.schema.categorical_field("Contract").unwrap();
        assert_eq!(field.baseline, "Month-to-month");
        assert_eq!(field.categories.len() - 1, field.indicator_columns().len());

        let idx: Vec<usize> = field
            .indicator_columns()
            .iter()
            .map(|c| enc.table.column_index(c).unwrap())
            .collect();
        for row in &enc.table.rows {
            let active: f64 = idx.iter().map(|&j| row[j]).sum();
            assert!(active == 0.0 || active == 1.0);
        }
        // Month-to-month rows carry no indicator.
        assert_eq!(enc.table.rows[0][3], 0.0);
        assert_eq!(enc.table.rows[0][4], 0.0);
        assert_eq!(enc.table.rows[1][3], 1.0);
    }

    #[test]
    fn encoding_is_stable_across_row_order() {
        let mut shuffled = sample();
        shuffled.rows.reverse();
        let a = encode(&sample(), &EncoderConfig::default()).unwrap();
        let b = encode(&shuffled, &EncoderConfig::default()).unwrap();
        assert_eq!(a.schema, b.schema);
    }

    #[test]
    fn missing_required_field_is_a_data_error() {
        let mut table = sample();
        table.headers[3] = "Total".to_string();
        let err = encode(&table, &EncoderConfig::default()).unwrap_err();
        assert!(matches!(err, AppError::Data(_)));
        assert!(err.to_string().contains("TotalCharges"));
    }

    #[test]
    fn unknown_label_drops_row() {
        let table = raw(&[
            &["a", "1", "One year", "10", "Maybe"],
            &["b", "2", "Two year", "20", "Yes"],
        ]);
        let enc = encode(&table, &EncoderConfig::default()).unwrap();
        assert_eq!(enc.table.n_rows(), 1);
        assert!(enc.row_errors[0].message.contains("Maybe"));
    }
}
