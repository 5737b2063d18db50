//! Churn classifiers and the persisted model artifact.
//!
//! Both variants are fitted in-crate and expose the same probability
//! contract; the artifact wraps them with their schema and preprocessing.

pub mod artifact;
pub mod forest;
pub mod logistic;
pub mod predict;
pub mod scaler;

pub use artifact::*;
pub use forest::*;
pub use logistic::*;
pub use predict::*;
pub use scaler::*;

/// Anything that maps a feature row to a positive-class probability.
pub trait ProbabilisticClassifier {
    /// Expected row width.
    fn n_features(&self) -> usize;

    fn predict_proba(&self, row: &[f64]) -> f64;

    fn predict_proba_batch(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_proba(r)).collect()
    }
}
