//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the feature schema shared by training and inference (`FeatureSchema`)
//! - raw and encoded tables (`RawTable`, `EncodedTable`)
//! - business parameters and targeting outputs (`BusinessParams`, `TargetingSelection`)

pub mod schema;
pub mod types;

pub use schema::*;
pub use types::*;
