//! Per-column standardization (`(x - mean) / std`), fitted with
//! `linfa-preprocessing`'s standard linear scaler.
//!
//! Population standard deviation; constant columns get a scale of 1 so they
//! pass through centered instead of dividing by zero.

use linfa::prelude::*;
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::math::to_records;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self, AppError> {
        let records = to_records(rows)?;
        let n = records.nrows();
        let dataset = Dataset::new(records, Array1::<usize>::zeros(n));
        let fitted = LinearScaler::standard()
            .fit(&dataset)
            .map_err(|e| AppError::model(format!("Scaler fit failed: {e}")))?;

        // linfa stores the multiplier 1/std; keep the divisor.
        let scale = fitted
            .scales()
            .iter()
            .map(|&m| {
                let sd = 1.0 / m;
                if sd.is_finite() && sd > 1e-12 { sd } else { 1.0 }
            })
            .collect();

        Ok(Self {
            mean: fitted.offsets().to_vec(),
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|r| self.transform_row(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns_and_keeps_constants_finite() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert!((scaler.mean[0] - 2.0).abs() < 1e-12);
        assert!((scaler.mean[1] - 5.0).abs() < 1e-12);
        assert!((scaler.scale[0] - 1.0).abs() < 1e-12);
        assert_eq!(scaler.scale[1], 1.0);
        let z = scaler.transform_row(&[3.0, 5.0]);
        assert!((z[0] - 1.0).abs() < 1e-12);
        assert_eq!(z[1], 0.0);
    }

    #[test]
    fn transformed_columns_are_centered() {
        let rows: Vec<Vec<f64>> = (0..25).map(|i| vec![i as f64 * 3.0 + 7.0, (i % 4) as f64]).collect();
        let scaler = StandardScaler::fit(&rows).unwrap();
        let z = scaler.transform(&rows);
        for j in 0..2 {
            let mean: f64 = z.iter().map(|r| r[j]).sum::<f64>() / z.len() as f64;
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
