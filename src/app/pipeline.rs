//! Stage logic shared by the CLI and the dashboard.
//!
//! Each `run_*` function loads its inputs, computes, writes its artifacts and
//! returns what the caller needs to print:
//!
//! raw CSV -> encoded CSV + schema -> model artifacts + report
//!         -> {explanation, targeting CSV, single predictions}

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::{
    AlignMode, BusinessParams, EncodedTable, FeatureInput, FeatureSchema, ModelVariant,
    SelectionPolicy, TargetingSelection,
};
use crate::error::AppError;
use crate::explain::{ExplanationSummary, RenderOptions, attribute, render_summary_png, summarize};
use crate::features::{EncoderConfig, Encoding, encode, schema_from_columns};
use crate::fit::{TrainOptions, TrainOutput, train};
use crate::io::{
    read_encoded_table, read_json, read_model_artifact, read_raw_table, write_encoded_csv,
    write_json, write_model_artifact, write_targets_csv,
};
use crate::models::{ModelArtifact, Prediction, demo_customer, predict_customer};

/// Encode the raw export and write the encoded table and its schema.
pub fn run_preprocess(input: &Path, output: &Path, schema_path: &Path) -> Result<Encoding, AppError> {
    let ingest = read_raw_table(input)?;
    let mut encoding = encode(&ingest.table, &EncoderConfig::default())?;

    // Malformed lines never reached the encoder; report them alongside its drops.
    if !ingest.row_errors.is_empty() {
        encoding.rows_read += ingest.row_errors.len();
        encoding.row_errors.extend(ingest.row_errors);
        encoding.row_errors.sort_by_key(|e| e.line);
    }
    if !encoding.row_errors.is_empty() {
        warn!(dropped = encoding.row_errors.len(), "rows dropped during preprocessing");
    }

    write_encoded_csv(output, &encoding.table)?;
    write_json(schema_path, &encoding.schema)?;
    info!(
        rows = encoding.table.n_rows(),
        features = encoding.schema.len(),
        output = %output.display(),
        "preprocess complete"
    );
    Ok(encoding)
}

/// Load the encoded table and the schema it was written with.
///
/// Tables produced elsewhere may come without a schema file; their schema is
/// derived from the header and treats every column as numeric.
pub fn load_training_data(data: &Path, schema_path: &Path) -> Result<(EncodedTable, FeatureSchema), AppError> {
    require(data, "preprocess")?;
    if schema_path.exists() {
        let schema: FeatureSchema = read_json(schema_path, "preprocess")?;
        let table = read_encoded_table(data, &schema.label)?;
        Ok((table, schema))
    } else {
        warn!(
            path = %schema_path.display(),
            "feature schema not found; deriving an all-numeric schema from the table header"
        );
        let table = read_encoded_table(data, &EncoderConfig::default().label_field)?;
        let schema = schema_from_columns(&table);
        Ok((table, schema))
    }
}

/// Train every requested variant and write artifacts and the report.
pub fn run_train(
    data: &Path,
    schema_path: &Path,
    models_dir: &Path,
    metrics_path: &Path,
    opts: &TrainOptions,
) -> Result<TrainOutput, AppError> {
    let (table, schema) = load_training_data(data, schema_path)?;
    let output = train(&table, &schema, opts)?;

    for artifact in &output.artifacts {
        let path = model_path(models_dir, artifact.variant);
        write_model_artifact(&path, artifact)?;
        info!(variant = artifact.variant.name(), path = %path.display(), "model saved");
    }
    write_json(metrics_path, &output.report)?;
    Ok(output)
}

pub fn model_path(models_dir: &Path, variant: ModelVariant) -> PathBuf {
    models_dir.join(variant.artifact_file())
}

/// Result of `run_explain`.
#[derive(Debug, Clone)]
pub struct ExplainOutput {
    pub summary: ExplanationSummary,
    /// `None` when the plot could not be rendered.
    pub png: Option<PathBuf>,
}

/// Attribute the model over the encoded table; write the JSON summary and the plot.
pub fn run_explain(
    data: &Path,
    model: &Path,
    png: &Path,
    summary_path: &Path,
    top_n: usize,
) -> Result<ExplainOutput, AppError> {
    let artifact = read_model_artifact(model)?;
    let table = load_scoring_table(data, &artifact)?;
    let features = table.features()?;

    let attributions = attribute(&artifact, &features)?;
    let summary = summarize(artifact.variant, &attributions);
    write_json(summary_path, &summary)?;

    let opts = RenderOptions {
        top_n,
        ..RenderOptions::default()
    };
    let png = match render_summary_png(png, &summary, &attributions, &opts) {
        Ok(()) => Some(png.to_path_buf()),
        Err(e) => {
            warn!(error = %e, "summary plot not written");
            None
        }
    };

    info!(rows = features.len(), "explain complete");
    Ok(ExplainOutput { summary, png })
}

/// Score all customers, select targets and write the targeting CSV.
pub fn run_optimize(
    data: &Path,
    model: &Path,
    output: &Path,
    params: &BusinessParams,
    policy: SelectionPolicy,
) -> Result<TargetingSelection, AppError> {
    params.validate()?;
    let artifact = read_model_artifact(model)?;
    let table = load_scoring_table(data, &artifact)?;

    let selection = crate::optimize::optimize(&table, &artifact, params, policy)?;
    write_targets_csv(output, &selection)?;
    Ok(selection)
}

/// Score one customer given as `name=value` pairs (the demo customer when empty).
pub fn run_predict<S: AsRef<str>>(model: &Path, fields: &[S], mode: AlignMode) -> Result<Prediction, AppError> {
    let input = if fields.is_empty() {
        demo_customer()
    } else {
        FeatureInput::from_pairs(fields)?
    };
    let artifact = read_model_artifact(model)?;
    predict_customer(&artifact, &input, mode)
}

/// Read the encoded table and check it against the artifact's schema.
pub fn load_scoring_table(data: &Path, artifact: &ModelArtifact) -> Result<EncodedTable, AppError> {
    require(data, "preprocess")?;
    let table = read_encoded_table(data, &artifact.schema.label)?;
    artifact.schema.ensure_matches(&table.feature_columns())?;
    Ok(table)
}

fn require(path: &Path, stage: &'static str) -> Result<(), AppError> {
    if path.exists() {
        Ok(())
    } else {
        Err(AppError::missing(path, stage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_name_their_prerequisite() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nothing.csv");

        let err = run_train(
            &missing,
            &dir.path().join("schema.json"),
            dir.path(),
            &dir.path().join("metrics.json"),
            &TrainOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::ArtifactMissing { stage: "preprocess", .. }));

        let err = run_predict::<&str>(&dir.path().join("models/logistic.json"), &[], AlignMode::Tolerant)
            .unwrap_err();
        assert!(matches!(err, AppError::ArtifactMissing { stage: "train", .. }));
    }

    #[test]
    fn invalid_business_params_fail_before_loading() {
        let dir = tempfile::tempdir().unwrap();
        let params = BusinessParams {
            retention_rate: 2.0,
            ..BusinessParams::default()
        };
        let err = run_optimize(
            &dir.path().join("a.csv"),
            &dir.path().join("m.json"),
            &dir.path().join("out.csv"),
            &params,
            SelectionPolicy::All,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn raw_input_missing_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_preprocess(
            &dir.path().join("raw.csv"),
            &dir.path().join("out.csv"),
            &dir.path().join("schema.json"),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Data(_)));
    }
}
