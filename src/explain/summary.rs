//! Ranked, signed summary of an attribution matrix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FeatureSchema, ModelVariant};
use crate::explain::attribution::{AttributionUnits, Attributions};
use crate::math::correlation;

/// How a feature's value relates to its attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Higher values push churn risk up.
    HigherRaisesRisk,
    /// Higher values push churn risk down.
    HigherLowersRisk,
    Mixed,
}

/// Correlations weaker than this are reported as mixed.
const DIRECTION_MIN_CORRELATION: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub mean_abs: f64,
    pub mean_signed: f64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationSummary {
    pub variant: ModelVariant,
    pub units: AttributionUnits,
    pub base_value: f64,
    pub n_rows: usize,
    pub generated_at: DateTime<Utc>,
    /// Sorted by `mean_abs`, most important first.
    pub features: Vec<FeatureImportance>,
}

pub fn summarize(variant: ModelVariant, attributions: &Attributions) -> ExplanationSummary {
    let n = attributions.n_rows().max(1) as f64;
    let mut features: Vec<FeatureImportance> = attributions
        .columns
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let phi = attributions.phi_column(j);
            let values = attributions.value_column(j);
            let direction = match correlation(&values, &phi) {
                Some(r) if r > DIRECTION_MIN_CORRELATION => Direction::HigherRaisesRisk,
                Some(r) if r < -DIRECTION_MIN_CORRELATION => Direction::HigherLowersRisk,
                _ => Direction::Mixed,
            };
            FeatureImportance {
                feature: name.clone(),
                mean_abs: phi.iter().map(|v| v.abs()).sum::<f64>() / n,
                mean_signed: phi.iter().sum::<f64>() / n,
                direction,
            }
        })
        .collect();

    // Stable: equal importances keep schema order.
    features.sort_by(|a, b| b.mean_abs.total_cmp(&a.mean_abs));

    ExplanationSummary {
        variant,
        units: attributions.units,
        base_value: attributions.base_value,
        n_rows: attributions.n_rows(),
        generated_at: Utc::now(),
        features,
    }
}

impl ExplanationSummary {
    pub fn top(&self, n: usize) -> &[FeatureImportance] {
        &self.features[..n.min(self.features.len())]
    }

    /// Plain-language statements for the `n` most important directional features.
    pub fn insights(&self, schema: &FeatureSchema, n: usize) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| f.direction != Direction::Mixed)
            .take(n)
            .map(|f| describe(schema, f))
            .collect()
    }
}

fn describe(schema: &FeatureSchema, f: &FeatureImportance) -> String {
    let raises = f.direction == Direction::HigherRaisesRisk;
    let effect = if raises { "higher" } else { "lower" };

    let indicator = schema.categorical.iter().find_map(|field| {
        field
            .encoded_categories()
            .find(|c| crate::domain::indicator_name(&field.name, c) == f.feature)
            .map(|c| (field.name.as_str(), c))
    });

    match indicator {
        Some((field, category)) => format!("{field} = {category} → {effect} churn risk"),
        None if raises => format!("High {} → higher churn risk", f.feature),
        None => format!("Low {} → higher churn risk", f.feature),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CategoricalField, SCHEMA_VERSION};

    fn attributions() -> Attributions {
        // tenure: higher value, lower φ. charges: higher value, higher φ.
        // contract indicator: set rows get negative φ. noise: no signal.
        let values = vec![
            vec![1.0, 90.0, 0.0, 5.0],
            vec![10.0, 70.0, 1.0, 5.0],
            vec![40.0, 50.0, 1.0, 5.0],
            vec![70.0, 20.0, 0.0, 5.0],
        ];
        let phi = vec![
            vec![0.9, 0.6, 0.1, 0.0],
            vec![0.5, 0.2, -0.3, 0.0],
            vec![-0.4, -0.1, -0.3, 0.0],
            vec![-1.0, -0.7, 0.1, 0.0],
        ];
        Attributions {
            columns: vec![
                "tenure".into(),
                "MonthlyCharges".into(),
                "Contract_Two year".into(),
                "noise".into(),
            ],
            values,
            phi,
            base_value: -1.0,
            units: AttributionUnits::LogOdds,
        }
    }

    fn schema() -> FeatureSchema {
        FeatureSchema {
            version: SCHEMA_VERSION,
            label: "Churn".into(),
            columns: attributions().columns,
            numeric: vec!["tenure".into(), "MonthlyCharges".into(), "noise".into()],
            categorical: vec![CategoricalField {
                name: "Contract".into(),
                baseline: "Month-to-month".into(),
                categories: vec!["Month-to-month".into(), "One year".into(), "Two year".into()],
            }],
        }
    }

    #[test]
    fn ranks_by_mean_absolute_attribution() {
        let summary = summarize(ModelVariant::Logistic, &attributions());
        let order: Vec<&str> = summary.features.iter().map(|f| f.feature.as_str()).collect();
        assert_eq!(order, vec!["tenure", "MonthlyCharges", "Contract_Two year", "noise"]);
        assert!((summary.features[0].mean_abs - 0.7).abs() < 1e-12);
        assert_eq!(summary.top(2).len(), 2);
        assert_eq!(summary.top(10).len(), 4);
    }

    #[test]
    fn directions_follow_value_correlation() {
        let summary = summarize(ModelVariant::Logistic, &attributions());
        let dir = |name: &str| {
            summary
                .features
                .iter()
                .find(|f| f.feature == name)
                .unwrap()
                .direction
        };
        assert_eq!(dir("tenure"), Direction::HigherLowersRisk);
        assert_eq!(dir("MonthlyCharges"), Direction::HigherRaisesRisk);
        assert_eq!(dir("Contract_Two year"), Direction::HigherLowersRisk);
        assert_eq!(dir("noise"), Direction::Mixed);
    }

    #[test]
    fn insights_read_like_sentences() {
        let summary = summarize(ModelVariant::Logistic, &attributions());
        let insights = summary.insights(&schema(), 3);
        assert_eq!(
            insights,
            vec![
                "Low tenure → higher churn risk".to_string(),
                "High MonthlyCharges → higher churn risk".to_string(),
                "Contract = Two year → lower churn risk".to_string(),
            ]
        );
    }
}
