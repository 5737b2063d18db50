//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages in-memory
//! - exported to CSV/JSON
//! - reloaded by later stages and the dashboard

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Classifier variants fitted by the trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Standard scaler followed by L2 logistic regression.
    Logistic,
    /// Bagged CART ensemble on raw features.
    RandomForest,
}

impl ModelVariant {
    pub const ALL: [ModelVariant; 2] = [ModelVariant::Logistic, ModelVariant::RandomForest];

    pub fn name(self) -> &'static str {
        match self {
            ModelVariant::Logistic => "logistic",
            ModelVariant::RandomForest => "random_forest",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ModelVariant::Logistic => "Logistic Regression (scaled pipeline)",
            ModelVariant::RandomForest => "Random Forest",
        }
    }

    pub fn artifact_file(self) -> String {
        format!("{}.json", self.name())
    }
}

/// How the inference aligner treats gaps between an input and the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum AlignMode {
    /// Absent columns become 0 and unknown categories are ignored.
    #[default]
    Tolerant,
    /// Every numeric field must be supplied and categories must be known.
    Strict,
}

/// Whether negative-profit customers may be targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Take the top customers by profit regardless of sign.
    #[default]
    All,
    /// Drop customers whose expected profit is not positive.
    ProfitableOnly,
}

/// A raw or encoded value supplied to the aligner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Category(String),
}

/// A partial customer record keyed by field or column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureInput {
    values: BTreeMap<String, FieldValue>,
}

impl FeatureInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn number(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), FieldValue::Number(value));
        self
    }

    pub fn category(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), FieldValue::Category(value.into()));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse `name=value` pairs; values that parse as numbers become numbers.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self, AppError> {
        let mut input = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let Some((name, value)) = pair.split_once('=') else {
                return Err(AppError::config(format!(
                    "Invalid field assignment '{pair}' (expected name=value)."
                )));
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(AppError::config(format!("Empty field name in '{pair}'.")));
            }
            let value = value.trim();
            match value.parse::<f64>() {
                Ok(v) if v.is_finite() => input.insert(name, FieldValue::Number(v)),
                _ => input.insert(name, FieldValue::Category(value.to_string())),
            }
        }
        Ok(input)
    }
}

/// A raw CSV table, cells trimmed, header preserved in file order.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

#[derive(Debug, Clone)]
pub struct RawRow {
    /// 1-based line number in the source file.
    pub line: usize,
    pub cells: Vec<String>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// A row-level problem encountered while reading or encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Numeric table: feature columns plus the label column, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedTable {
    pub columns: Vec<String>,
    pub label: String,
    pub rows: Vec<Vec<f64>>,
}

impl EncodedTable {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn label_index(&self) -> Result<usize, AppError> {
        self.column_index(&self.label)
            .ok_or_else(|| AppError::data(format!("Missing label column `{}`.", self.label)))
    }

    /// Column names without the label, in table order.
    pub fn feature_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| **c != self.label)
            .cloned()
            .collect()
    }

    /// Feature matrix (label removed), one `Vec` per row.
    pub fn features(&self) -> Result<Vec<Vec<f64>>, AppError> {
        let label_idx = self.label_index()?;
        Ok(self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(j, _)| *j != label_idx)
                    .map(|(_, v)| *v)
                    .collect()
            })
            .collect())
    }

    /// Label vector; fails on anything other than 0/1.
    pub fn labels(&self) -> Result<Vec<u8>, AppError> {
        let label_idx = self.label_index()?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| match row[label_idx] {
                v if v == 0.0 => Ok(0),
                v if v == 1.0 => Ok(1),
                v => Err(AppError::data(format!(
                    "Row {i}: label `{}` must be 0 or 1, found {v}.",
                    self.label
                ))),
            })
            .collect()
    }

    /// Fraction of rows with label 1.
    pub fn positive_rate(&self) -> Option<f64> {
        let label_idx = self.column_index(&self.label)?;
        if self.rows.is_empty() {
            return None;
        }
        let positives = self.rows.iter().filter(|r| r[label_idx] == 1.0).count();
        Some(positives as f64 / self.rows.len() as f64)
    }
}

/// Retention-offer economics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BusinessParams {
    /// Currency spent per targeted customer.
    pub discount: f64,
    /// Probability that an offer retains an otherwise-churning customer.
    pub retention_rate: f64,
    /// Total currency available for offers.
    pub budget: f64,
}

impl Default for BusinessParams {
    fn default() -> Self {
        Self {
            discount: 50.0,
            retention_rate: 0.4,
            budget: 10_000.0,
        }
    }
}

impl BusinessParams {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.discount.is_finite() && self.discount > 0.0) {
            return Err(AppError::config(format!(
                "discount must be finite and > 0 (got {}).",
                self.discount
            )));
        }
        if !(0.0..=1.0).contains(&self.retention_rate) {
            return Err(AppError::config(format!(
                "retention_rate must be within [0, 1] (got {}).",
                self.retention_rate
            )));
        }
        if !(self.budget.is_finite() && self.budget >= 0.0) {
            return Err(AppError::config(format!(
                "budget must be finite and >= 0 (got {}).",
                self.budget
            )));
        }
        Ok(())
    }

    /// `floor(budget / discount)`.
    pub fn max_customers(&self) -> usize {
        (self.budget / self.discount).floor() as usize
    }
}

/// An encoded customer with its targeting economics.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerScored {
    /// Position of the customer in the encoded table.
    pub row_index: usize,
    /// The encoded record, label included, in table column order.
    pub values: Vec<f64>,
    pub churn_prob: f64,
    pub expected_revenue: f64,
    pub expected_profit: f64,
}

/// Customers chosen for a retention offer, best first.
#[derive(Debug, Clone)]
pub struct TargetingSelection {
    pub columns: Vec<String>,
    pub customers: Vec<CustomerScored>,
    pub pool_size: usize,
    pub max_customers: usize,
}

impl TargetingSelection {
    pub fn total_expected_profit(&self) -> f64 {
        self.customers.iter().map(|c| c.expected_profit).sum()
    }
}

/// Three-tier risk banding used for single-customer predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    High,
    Medium,
    Low,
}

impl RiskBand {
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.6 {
            RiskBand::High
        } else if p >= 0.4 {
            RiskBand::Medium
        } else {
            RiskBand::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::High => "High risk",
            RiskBand::Medium => "Medium risk",
            RiskBand::Low => "Lower risk",
        }
    }

    pub fn action(self) -> &'static str {
        match self {
            RiskBand::High => "prioritize retention offer + support follow-up.",
            RiskBand::Medium => "consider lighter retention action.",
            RiskBand::Low => "no immediate action needed.",
        }
    }
}

/// Fixed artifact locations shared by every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactPaths {
    pub raw: PathBuf,
    pub processed: PathBuf,
    /// Schema written by `preprocess` next to the encoded table.
    pub schema: PathBuf,
    pub models_dir: PathBuf,
    pub metrics: PathBuf,
    pub explanation_png: PathBuf,
    pub explanation_json: PathBuf,
    pub targets: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            raw: PathBuf::from("data/raw/telco_churn.csv"),
            processed: PathBuf::from("data/processed/churn_clean.csv"),
            schema: PathBuf::from("data/processed/feature_schema.json"),
            models_dir: PathBuf::from("models"),
            metrics: PathBuf::from("reports/metrics.json"),
            explanation_png: PathBuf::from("reports/shap_summary.png"),
            explanation_json: PathBuf::from("reports/shap_summary.json"),
            targets: PathBuf::from("reports/optimized_targets.csv"),
        }
    }
}

impl ArtifactPaths {
    /// Root every default path under `dir`.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let d = Self::default();
        Self {
            raw: dir.join(d.raw),
            processed: dir.join(d.processed),
            schema: dir.join(d.schema),
            models_dir: dir.join(d.models_dir),
            metrics: dir.join(d.metrics),
            explanation_png: dir.join(d.explanation_png),
            explanation_json: dir.join(d.explanation_json),
            targets: dir.join(d.targets),
        }
    }

    pub fn model(&self, variant: ModelVariant) -> PathBuf {
        self.models_dir.join(variant.artifact_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_bound_is_floor_of_ratio() {
        let params = BusinessParams {
            discount: 50.0,
            retention_rate: 0.4,
            budget: 10_000.0,
        };
        assert_eq!(params.max_customers(), 200);

        let odd = BusinessParams {
            budget: 10_049.0,
            ..params
        };
        assert_eq!(odd.max_customers(), 200);
    }

    #[test]
    fn invalid_business_params_are_rejected() {
        let base = BusinessParams::default();
        assert!(base.validate().is_ok());
        assert!(BusinessParams { discount: 0.0, ..base }.validate().is_err());
        assert!(BusinessParams { retention_rate: 1.5, ..base }.validate().is_err());
        assert!(BusinessParams { budget: -1.0, ..base }.validate().is_err());
    }

    #[test]
    fn risk_band_thresholds() {
        assert_eq!(RiskBand::from_probability(0.6), RiskBand::High);
        assert_eq!(RiskBand::from_probability(0.59), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.4), RiskBand::Medium);
        assert_eq!(RiskBand::from_probability(0.39), RiskBand::Low);
    }

    #[test]
    fn feature_input_pairs_split_numbers_and_categories() {
        let input =
            FeatureInput::from_pairs(&["tenure=2", "Contract = One year", "MonthlyCharges=95.5"]).unwrap();
        assert_eq!(input.get("tenure"), Some(&FieldValue::Number(2.0)));
        assert_eq!(input.get("Contract"), Some(&FieldValue::Category("One year".to_string())));
        assert_eq!(input.get("MonthlyCharges"), Some(&FieldValue::Number(95.5)));
        assert!(FeatureInput::from_pairs(&["novalue"]).is_err());
    }

    #[test]
    fn labels_reject_non_binary_values() {
        let table = EncodedTable {
            columns: vec!["tenure".to_string(), "Churn".to_string()],
            label: "Churn".to_string(),
            rows: vec![vec![1.0, 0.0], vec![2.0, 2.0]],
        };
        assert!(table.labels().is_err());
        assert_eq!(table.features().unwrap(), vec![vec![1.0], vec![2.0]]);
    }
}
