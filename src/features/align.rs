//! Map an arbitrary (partial) customer record onto a trained feature schema.
//!
//! The output always has exactly `schema.len()` values in schema order:
//! - a numeric value keyed by a schema column is copied into that column
//! - a category keyed by a categorical field sets that category's indicator;
//!   the baseline category sets nothing
//! - fields the schema doesn't know are ignored
//! - columns nobody supplied stay 0
//!
//! In `Strict` mode numeric fields must be supplied and categories must be
//! known to the schema, so "absent" is never silently read as "baseline".

use tracing::trace;

use crate::domain::{AlignMode, FeatureInput, FeatureSchema, FieldValue, indicator_name};
use crate::error::AppError;

/// A single row aligned to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    pub values: Vec<f64>,
    /// Input fields that did not map onto any schema column.
    pub ignored: Vec<String>,
}

/// Align `input` to `schema`.
pub fn align(input: &FeatureInput, schema: &FeatureSchema, mode: AlignMode) -> Result<AlignedRow, AppError> {
    let mut values = vec![0.0; schema.len()];
    let mut ignored = Vec::new();

    for (name, value) in input.iter() {
        match value {
            FieldValue::Number(v) => {
                if let Some(j) = schema.index_of(name) {
                    values[j] = *v;
                } else if let Some(field) = schema.categorical_field(name) {
                    // A number given for a categorical field cannot select a category.
                    if mode == AlignMode::Strict {
                        return Err(AppError::schema(format!(
                            "field `{}` is categorical; got numeric value {v}",
                            field.name
                        )));
                    }
                    ignored.push(name.clone());
                } else {
                    ignored.push(name.clone());
                }
            }
            FieldValue::Category(category) => {
                if let Some(field) = schema.categorical_field(name) {
                    if *category == field.baseline {
                        continue;
                    }
                    let column = indicator_name(&field.name, category);
                    match schema.index_of(&column) {
                        Some(j) => values[j] = 1.0,
                        None if mode == AlignMode::Strict => {
                            return Err(AppError::schema(format!(
                                "unknown category '{category}' for field `{name}` (known: {})",
                                field.categories.join(", ")
                            )));
                        }
                        None => ignored.push(name.clone()),
                    }
                } else if let Some(j) = schema.index_of(&indicator_name(name, category)) {
                    // Schema without categorical metadata: fall back to the naming convention.
                    values[j] = 1.0;
                } else if mode == AlignMode::Strict && schema.is_numeric(name) {
                    return Err(AppError::schema(format!(
                        "field `{name}` is numeric; got '{category}'"
                    )));
                } else {
                    ignored.push(name.clone());
                }
            }
        }
    }

    if mode == AlignMode::Strict {
        let missing: Vec<&str> = schema
            .numeric
            .iter()
            .filter(|n| !matches!(input.get(n), Some(FieldValue::Number(_))))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::schema(format!(
                "missing required numeric fields: {}",
                missing.join(", ")
            )));
        }
    }

    if !ignored.is_empty() {
        trace!(?ignored, "alignment ignored input fields");
    }

    Ok(AlignedRow { values, ignored })
}

/// Turn an already-encoded row back into an input keyed by column name.
pub fn input_from_row(schema: &FeatureSchema, row: &[f64]) -> FeatureInput {
    schema
        .columns
        .iter()
        .zip(row.iter())
        .fold(FeatureInput::new(), |input, (name, v)| input.number(name.clone(), *v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoricalField, SCHEMA_VERSION};

    fn field(name: &str, categories: &[&str]) -> CategoricalField {
        CategoricalField {
            name: name.to_string(),
            baseline: categories[0].to_string(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn schema() -> FeatureSchema {
        let categorical = vec![
            field("InternetService", &["DSL", "Fiber optic", "No"]),
            field("Contract", &["Month-to-month", "One year", "Two year"]),
            field("StreamingTV", &["No", "No internet service", "Yes"]),
            field("StreamingMovies", &["No", "No internet service", "Yes"]),
            field("PaperlessBilling", &["No", "Yes"]),
            field(
                "PaymentMethod",
                &[
                    "Bank transfer (automatic)",
                    "Credit card (automatic)",
                    "Electronic check",
                    "Mailed check",
                ],
            ),
        ];
        let numeric: Vec<String> = ["SeniorCitizen", "tenure", "MonthlyCharges", "TotalCharges"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut columns = numeric.clone();
        for f in &categorical {
            columns.extend(f.indicator_columns());
        }
        FeatureSchema {
            version: SCHEMA_VERSION,
            label: "Churn".to_string(),
            columns,
            numeric,
            categorical,
        }
    }

    fn value(schema: &FeatureSchema, row: &AlignedRow, column: &str) -> f64 {
        row.values[schema.index_of(column).unwrap()]
    }

    #[test]
    fn high_risk_example_keeps_indicators() {
        let s = schema();
        let input = FeatureInput::new()
            .number("tenure", 2.0)
            .number("MonthlyCharges", 95.0)
            .number("TotalCharges", 180.0)
            .number("InternetService_Fiber optic", 1.0)
            .number("Contract_Two year", 0.0)
            .number("Contract_One year", 0.0)
            .number("StreamingTV_Yes", 1.0)
            .number("StreamingMovies_Yes", 1.0)
            .number("PaperlessBilling_Yes", 1.0)
            .number("PaymentMethod_Electronic check", 1.0);

        let row = align(&input, &s, AlignMode::Tolerant).unwrap();
        assert_eq!(row.values.len(), s.len());
        assert_eq!(value(&s, &row, "InternetService_Fiber optic"), 1.0);
        assert_eq!(value(&s, &row, "PaymentMethod_Electronic check"), 1.0);
        assert_eq!(value(&s, &row, "Contract_One year"), 0.0);
        assert_eq!(value(&s, &row, "Contract_Two year"), 0.0);
        assert_eq!(value(&s, &row, "SeniorCitizen"), 0.0);
        assert_eq!(value(&s, &row, "MonthlyCharges"), 95.0);
        assert!(row.ignored.is_empty());
    }

    #[test]
    fn aligning_an_aligned_row_is_identity() {
        let s = schema();
        let original: Vec<f64> = (0..s.len()).map(|i| (i % 3) as f64).collect();
        let input = input_from_row(&s, &original);
        let row = align(&input, &s, AlignMode::Tolerant).unwrap();
        assert_eq!(row.values, original);
    }

    #[test]
    fn output_width_is_schema_width_for_any_input() {
        let s = schema();
        let inputs = [
            FeatureInput::new(),
            FeatureInput::new().number("unknown", 3.0).category("Region", "North"),
            FeatureInput::new().number("tenure", 5.0).number("extra_1", 1.0).number("extra_2", 2.0),
        ];
        for input in &inputs {
            let row = align(input, &s, AlignMode::Tolerant).unwrap();
            assert_eq!(row.values.len(), s.len());
        }
        let row = align(&inputs[1], &s, AlignMode::Tolerant).unwrap();
        assert!(row.values.iter().all(|v| *v == 0.0));
        assert_eq!(row.ignored, vec!["Region".to_string(), "unknown".to_string()]);
    }

    #[test]
    fn raw_categories_select_one_indicator_and_baseline_selects_none() {
        let s = schema();
        let input = FeatureInput::new()
            .category("Contract", "Two year")
            .category("InternetService", "DSL")
            .category("PaymentMethod", "Mailed check");
        let row = align(&input, &s, AlignMode::Tolerant).unwrap();

        assert_eq!(value(&s, &row, "Contract_Two year"), 1.0);
        assert_eq!(value(&s, &row, "Contract_One year"), 0.0);
        assert_eq!(value(&s, &row, "InternetService_Fiber optic"), 0.0);
        assert_eq!(value(&s, &row, "InternetService_No"), 0.0);
        assert_eq!(value(&s, &row, "PaymentMethod_Mailed check"), 1.0);
        assert_eq!(row.values.iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn strict_mode_rejects_missing_numeric_and_unknown_category() {
        let s = schema();
        let partial = FeatureInput::new().number("tenure", 2.0);
        let err = align(&partial, &s, AlignMode::Strict).unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch(_)));
        assert!(err.to_string().contains("MonthlyCharges"));

        let complete = FeatureInput::new()
            .number("SeniorCitizen", 0.0)
            .number("tenure", 2.0)
            .number("MonthlyCharges", 95.0)
            .number("TotalCharges", 180.0);
        assert!(align(&complete, &s, AlignMode::Strict).is_ok());

        let bad_category = complete.category("Contract", "Three year");
        assert!(align(&bad_category, &s, AlignMode::Strict).is_err());
        assert!(align(&bad_category, &s, AlignMode::Tolerant).is_ok());
    }
}
