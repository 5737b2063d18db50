//! Stratified train/test split.
//!
//! Rows of each class are shuffled with a seeded RNG and the first
//! `round(n_class * test_fraction)` of each class go to the test set, so both
//! sides keep the overall churn rate. Index lists are returned sorted.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<TrainTestSplit, AppError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(AppError::config(format!(
            "test fraction must be in (0, 1) (got {test_fraction})."
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();

    for class in [0u8, 1u8] {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &y)| y == class)
            .map(|(i, _)| i)
            .collect();
        if members.len() < 2 {
            return Err(AppError::data(format!(
                "class {class} has {} row(s); at least 2 are needed to stratify.",
                members.len()
            )));
        }
        members.shuffle(&mut rng);

        let n_test = ((members.len() as f64 * test_fraction).round() as usize).clamp(1, members.len() - 1);
        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(TrainTestSplit { train, test })
}

/// Pick `rows[i]` for each index.
pub fn take_rows<T: Clone>(rows: &[T], idx: &[usize]) -> Vec<T> {
    idx.iter().map(|&i| rows[i].clone()).collect()
}
