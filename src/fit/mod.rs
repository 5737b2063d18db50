//! Model training: stratified split, fitting and held-out evaluation.
//!
//! - `split`: seeded stratified train/test indices
//! - `metrics`: ROC-AUC, F1, recall and the classification report
//! - `trainer`: fits each variant and assembles the train report

pub mod metrics;
pub mod split;
pub mod trainer;

pub use trainer::{TrainOptions, TrainOutput, TrainReport, VariantMetrics, train};
