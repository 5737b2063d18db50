//! Model explanations: per-feature attributions, a ranked summary and the
//! summary plot.

pub mod attribution;
pub mod render;
pub mod summary;

pub use attribution::{AttributionUnits, Attributions, attribute};
pub use render::{RenderOptions, render_summary_png};
pub use summary::{Direction, ExplanationSummary, FeatureImportance, summarize};
