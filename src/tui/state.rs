//! Everything the dashboard shows, loaded once at startup.
//!
//! The encoded dataset and the deployed model are required. The train report,
//! explanation and targeting list are optional: when one is missing or
//! unreadable the dashboard shows a warning in its place.

use std::path::{Path, PathBuf};

use crate::app::pipeline::load_scoring_table;
use crate::cli::DashboardArgs;
use crate::domain::EncodedTable;
use crate::error::AppError;
use crate::explain::ExplanationSummary;
use crate::fit::TrainReport;
use crate::io::{read_encoded_table, read_json, read_model_artifact};
use crate::models::ModelArtifact;
use crate::report::DatasetSnapshot;

/// Rows of the targeting list kept for display.
pub const TARGETS_SHOWN: usize = 20;

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub table: EncodedTable,
    pub snapshot: DatasetSnapshot,
    pub artifact: ModelArtifact,
    pub model_path: PathBuf,
    pub report: Option<TrainReport>,
    pub summary: Option<ExplanationSummary>,
    pub png: Option<PathBuf>,
    /// First rows of the targeting CSV, columns as written.
    pub targets: Option<EncodedTable>,
    pub warnings: Vec<String>,
}

impl DashboardState {
    pub fn load(args: &DashboardArgs) -> Result<Self, AppError> {
        let artifact = read_model_artifact(&args.model)?;
        let table = load_scoring_table(&args.data, &artifact)?;
        let mut warnings = Vec::new();

        let report = optional(read_json::<TrainReport>(&args.metrics, "train"), &mut warnings);
        let summary = optional(
            read_json::<ExplanationSummary>(&args.summary, "explain"),
            &mut warnings,
        );
        let png = if args.png.exists() {
            Some(args.png.clone())
        } else {
            warnings.push(format!(
                "{} not found. Run: churn explain",
                args.png.display()
            ));
            None
        };
        let targets = optional(load_targets(&args.targets, &artifact.schema.label), &mut warnings);

        Ok(Self {
            snapshot: DatasetSnapshot::from_table(&table),
            table,
            artifact,
            model_path: args.model.clone(),
            report,
            summary,
            png,
            targets,
            warnings,
        })
    }
}

fn load_targets(path: &Path, label: &str) -> Result<EncodedTable, AppError> {
    if !path.exists() {
        return Err(AppError::missing(path, "optimize"));
    }
    let mut table = read_encoded_table(path, label)?;
    table.rows.truncate(TARGETS_SHOWN);
    Ok(table)
}

fn optional<T>(result: Result<T, AppError>, warnings: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warnings.push(e.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_model_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let args = DashboardArgs {
            data: dir.path().join("data.csv"),
            model: dir.path().join("models/logistic.json"),
            metrics: dir.path().join("metrics.json"),
            summary: dir.path().join("summary.json"),
            png: dir.path().join("summary.png"),
            targets: dir.path().join("targets.csv"),
        };
        let err = DashboardState::load(&args).unwrap_err();
        assert!(matches!(err, AppError::ArtifactMissing { stage: "train", .. }));
    }

    #[test]
    fn optional_failures_become_warnings() {
        let mut warnings = Vec::new();
        let missing: Result<u8, AppError> = Err(AppError::missing(Path::new("reports/metrics.json"), "train"));
        assert_eq!(optional(missing, &mut warnings), None);
        assert_eq!(optional(Ok(3u8), &mut warnings), Some(3));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("churn train"));
    }
}
