//! Per-row, per-feature attributions for a trained pipeline.
//!
//! Attributions are computed in the classifier's input space, i.e. after the
//! pipeline's scaler. The background distribution is the explained data.
//!
//! - logistic: `φ_ij = w_j (x_ij - mean_j)` in log-odds; for a linear model
//!   with independent features these are the exact Shapley values, and
//!   `base + Σ_j φ_ij` is the row's log-odds
//! - random forest: decision-path attribution averaged over trees, in
//!   probability units; `base + Σ_j φ_ij` is the row's probability

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::math::column_means;
use crate::models::{Classifier, ModelArtifact};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionUnits {
    LogOdds,
    Probability,
}

impl AttributionUnits {
    pub fn label(self) -> &'static str {
        match self {
            AttributionUnits::LogOdds => "log-odds",
            AttributionUnits::Probability => "probability",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attributions {
    pub columns: Vec<String>,
    /// Inputs as seen by the classifier (scaled when the pipeline scales).
    pub values: Vec<Vec<f64>>,
    /// One attribution per (row, column).
    pub phi: Vec<Vec<f64>>,
    pub base_value: f64,
    pub units: AttributionUnits,
}

impl Attributions {
    pub fn n_rows(&self) -> usize {
        self.phi.len()
    }

    /// Column `j` of the attribution matrix.
    pub fn phi_column(&self, j: usize) -> Vec<f64> {
        self.phi.iter().map(|r| r[j]).collect()
    }

    pub fn value_column(&self, j: usize) -> Vec<f64> {
        self.values.iter().map(|r| r[j]).collect()
    }
}

/// Attribute every row of `features` (raw encoded features, schema order).
pub fn attribute(artifact: &ModelArtifact, features: &[Vec<f64>]) -> Result<Attributions, AppError> {
    artifact.validate()?;
    if features.is_empty() {
        return Err(AppError::data("Nothing to explain: the feature matrix is empty."));
    }
    let width = artifact.n_features();
    if let Some(row) = features.iter().find(|r| r.len() != width) {
        return Err(AppError::model(format!(
            "model expects {width} features, got a row with {}",
            row.len()
        )));
    }

    let values = artifact.pipeline.transform(features);

    let (phi, base_value, units) = match &artifact.pipeline.classifier {
        Classifier::Logistic(model) => {
            let means = column_means(&values);
            let base = model.decision_function(&means);
            let phi = values
                .iter()
                .map(|row| {
                    row.iter()
                        .zip(&means)
                        .zip(&model.coefficients)
                        .map(|((x, m), w)| w * (x - m))
                        .collect()
                })
                .collect();
            (phi, base, AttributionUnits::LogOdds)
        }
        Classifier::RandomForest(forest) => {
            let per_row: Vec<(f64, Vec<f64>)> =
                values.par_iter().map(|row| forest.path_contributions(row)).collect();
            let base = per_row.first().map(|(b, _)| *b).unwrap_or(0.0);
            let phi = per_row.into_iter().map(|(_, c)| c).collect();
            (phi, base, AttributionUnits::Probability)
        }
    };

    debug!(
        rows = values.len(),
        features = width,
        units = units.label(),
        base_value,
        "attributions computed"
    );

    Ok(Attributions {
        columns: artifact.schema.columns.clone(),
        values,
        phi,
        base_value,
        units,
    })
}
