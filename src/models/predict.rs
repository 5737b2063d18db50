//! Single-customer scoring: align a partial record, then ask the artifact.

use crate::domain::{AlignMode, FeatureInput, RiskBand};
use crate::error::AppError;
use crate::features::align;
use crate::models::ModelArtifact;

/// Result of scoring one customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub churn_prob: f64,
    pub band: RiskBand,
    /// Input fields the schema did not know.
    pub ignored: Vec<String>,
}

/// Probability for an already-aligned row.
pub fn predict_proba(artifact: &ModelArtifact, row: &[f64]) -> Result<f64, AppError> {
    artifact.predict_proba_row(row)
}

/// Align `input` against the artifact's schema and score it.
pub fn predict_customer(
    artifact: &ModelArtifact,
    input: &FeatureInput,
    mode: AlignMode,
) -> Result<Prediction, AppError> {
    let aligned = align(input, &artifact.schema, mode)?;
    let churn_prob = predict_proba(artifact, &aligned.values)?;
    Ok(Prediction {
        churn_prob,
        band: RiskBand::from_probability(churn_prob),
        ignored: aligned.ignored,
    })
}

/// A new fiber customer on a monthly contract paying by electronic check.
pub fn demo_customer() -> FeatureInput {
    FeatureInput::new()
        .number("tenure", 2.0)
        .number("MonthlyCharges", 95.0)
        .number("TotalCharges", 180.0)
        .number("InternetService_Fiber optic", 1.0)
        .number("Contract_Two year", 0.0)
        .number("Contract_One year", 0.0)
        .number("StreamingTV_Yes", 1.0)
        .number("StreamingMovies_Yes", 1.0)
        .number("PaperlessBilling_Yes", 1.0)
        .number("PaymentMethod_Electronic check", 1.0)
}
