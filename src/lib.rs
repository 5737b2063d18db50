//! `churn-targeting` library crate.
//!
//! The binary (`churn`) is a thin wrapper around this library so that:
//!
//! - every stage is testable without spawning processes
//! - the CLI and the dashboard share one implementation of each stage
//!
//! Stages: `preprocess` (features) -> `train` (fit, models) -> `explain` and
//! `optimize`, with `predict` and the dashboard reading the saved artifacts.

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod explain;
pub mod features;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod optimize;
pub mod report;
pub mod tui;
