//! Conversion from row-major feature rows to the `ndarray` records linfa fits on.

use ndarray::Array2;

use crate::error::AppError;

/// Packs `rows` into an `n x p` matrix; rejects empty and ragged input.
pub fn to_records(rows: &[Vec<f64>]) -> Result<Array2<f64>, AppError> {
    let Some(first) = rows.first() else {
        return Err(AppError::model("Cannot build a feature matrix from zero rows."));
    };
    let p = first.len();
    if let Some(bad) = rows.iter().find(|r| r.len() != p) {
        return Err(AppError::model(format!(
            "Ragged feature matrix: expected {p} columns, found {}.",
            bad.len()
        )));
    }
    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), p), flat).map_err(|e| AppError::model(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_row_major_order() {
        let m = to_records(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.dim(), (3, 2));
        assert_eq!(m[[2, 0]], 5.0);
        assert_eq!(m[[0, 1]], 2.0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(to_records(&[vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(to_records(&[]).is_err());
    }
}
