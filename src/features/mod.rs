//! Feature engineering shared by training and inference.
//!
//! - raw table → encoded table + schema (`encoder`)
//! - partial record → schema-aligned row (`align`)

pub mod align;
pub mod encoder;

pub use align::*;
pub use encoder::*;
