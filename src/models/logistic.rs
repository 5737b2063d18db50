//! L2-regularized binary logistic regression, fitted with `linfa-logistic`.
//!
//! Objective (intercept not penalized):
//!
//! ```text
//! min  Σ_i logloss(y_i, σ(b + wᵀx_i)) + ||w||² / (2C)
//! ```
//!
//! which is linfa's objective with `alpha = 1/C`. Only the weights and the
//! intercept are kept.

use linfa::prelude::*;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppError;
use crate::math::{sigmoid, to_records};

/// Fitting options for [`LogisticRegression::fit`].
#[derive(Debug, Clone, Copy)]
pub struct LogisticOptions {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Gradient-norm tolerance for the L-BFGS solver.
    pub tol: f64,
}

impl Default for LogisticOptions {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 3000,
            tol: 1e-8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LogisticRegression {
    pub fn fit(x: &[Vec<f64>], y: &[u8], opts: &LogisticOptions) -> Result<Self, AppError> {
        if x.is_empty() {
            return Err(AppError::model("Cannot fit logistic regression on zero rows."));
        }
        if x.len() != y.len() {
            return Err(AppError::model(format!(
                "Feature/label length mismatch: {} rows vs {} labels.",
                x.len(),
                y.len()
            )));
        }
        if !(opts.c.is_finite() && opts.c > 0.0) {
            return Err(AppError::config(format!("C must be > 0 (got {}).", opts.c)));
        }

        let records = to_records(x)?;
        let targets: Array1<usize> = y.iter().map(|&v| usize::from(v)).collect();
        let dataset = Dataset::new(records, targets);

        let fitted = linfa_logistic::LogisticRegression::default()
            .alpha(1.0 / opts.c)
            .gradient_tolerance(opts.tol)
            .max_iterations(opts.max_iter as u64)
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| AppError::model(format!("Logistic regression fit failed: {e}")))?;

        // linfa picks its own positive class; orient log-odds towards label 1.
        let sign = if fitted.labels().pos.class == 1 { 1.0 } else { -1.0 };
        let intercept = sign * fitted.intercept();
        let coefficients: Vec<f64> = fitted.params().iter().map(|w| sign * w).collect();

        if !intercept.is_finite() || coefficients.iter().any(|v| !v.is_finite()) {
            return Err(AppError::model("Logistic regression produced non-finite coefficients."));
        }
        debug!(features = coefficients.len(), intercept, "logistic regression fitted");

        Ok(Self {
            intercept,
            coefficients,
        })
    }

    pub fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Log-odds of the positive class.
    pub fn decision_function(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, v)| w * v)
                .sum::<f64>()
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.decision_function(row))
    }
}
