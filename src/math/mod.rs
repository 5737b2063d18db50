//! Mathematical utilities: ndarray conversion and small statistics helpers.

pub mod matrix;
pub mod stats;

pub use matrix::*;
pub use stats::*;
