//! Input/output helpers.
//!
//! - CSV ingest for raw and encoded tables (`ingest`)
//! - CSV exports with atomic writes (`export`)
//! - JSON artifacts: models, reports, explanation summaries (`artifact`)

pub mod artifact;
pub mod export;
pub mod ingest;

pub use artifact::*;
pub use export::*;
pub use ingest::*;
