//! Fit every classifier variant on a stratified split and evaluate it.
//!
//! The trainer is pure: it returns artifacts and a report and leaves writing
//! them to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{EncodedTable, FeatureSchema, ModelVariant};
use crate::error::AppError;
use crate::fit::metrics::{ClassificationReport, classification_report, roc_auc, threshold_predictions};
use crate::fit::split::{TrainTestSplit, stratified_split, take_rows};
use crate::models::{
    Classifier, ForestOptions, LogisticOptions, LogisticRegression, ModelArtifact, Pipeline,
    ProbabilisticClassifier, RandomForest, StandardScaler,
};

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub variants: Vec<ModelVariant>,
    pub test_fraction: f64,
    pub seed: u64,
    /// Probability cut-off for the hard-label metrics.
    pub threshold: f64,
    pub logistic: LogisticOptions,
    pub forest: ForestOptions,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            variants: ModelVariant::ALL.to_vec(),
            test_fraction: 0.2,
            seed: 42,
            threshold: 0.5,
            logistic: LogisticOptions::default(),
            forest: ForestOptions::default(),
        }
    }
}

/// Held-out metrics of one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub variant: ModelVariant,
    pub roc_auc: f64,
    pub f1: f64,
    pub recall: f64,
    pub report: ClassificationReport,
}

/// Persisted summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub trained_at: DateTime<Utc>,
    pub n_rows: usize,
    pub n_train: usize,
    pub n_test: usize,
    pub n_features: usize,
    pub positive_rate: f64,
    pub seed: u64,
    pub variants: Vec<VariantMetrics>,
}

impl TrainReport {
    pub fn variant(&self, variant: ModelVariant) -> Option<&VariantMetrics> {
        self.variants.iter().find(|m| m.variant == variant)
    }
}

#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub artifacts: Vec<ModelArtifact>,
    pub report: TrainReport,
}

pub fn train(table: &EncodedTable, schema: &FeatureSchema, opts: &TrainOptions) -> Result<TrainOutput, AppError> {
    schema.ensure_matches(&table.feature_columns())?;
    let x = table.features()?;
    let y = table.labels()?;
    if opts.variants.is_empty() {
        return Err(AppError::config("No model variants selected."));
    }

    let split = stratified_split(&y, opts.test_fraction, opts.seed)?;
    let TrainTestSplit { train, test } = &split;
    let x_train = take_rows(&x, train);
    let y_train = take_rows(&y, train);
    let x_test = take_rows(&x, test);
    let y_test = take_rows(&y, test);

    info!(
        rows = x.len(),
        train = train.len(),
        test = test.len(),
        features = schema.len(),
        "training split ready"
    );

    let mut artifacts = Vec::with_capacity(opts.variants.len());
    let mut metrics = Vec::with_capacity(opts.variants.len());

    for &variant in &opts.variants {
        let pipeline = fit_pipeline(variant, &x_train, &y_train, opts)?;
        let artifact = ModelArtifact::new(schema.clone(), pipeline);

        let scores = artifact
            .pipeline
            .classifier
            .predict_proba_batch(&artifact.pipeline.transform(&x_test));
        let m = evaluate(variant, &y_test, &scores, opts.threshold)?;
        info!(
            variant = variant.name(),
            roc_auc = m.roc_auc,
            f1 = m.f1,
            recall = m.recall,
            "variant evaluated"
        );

        artifacts.push(artifact);
        metrics.push(m);
    }

    let positives = y.iter().filter(|&&v| v == 1).count();
    let report = TrainReport {
        trained_at: Utc::now(),
        n_rows: x.len(),
        n_train: train.len(),
        n_test: test.len(),
        n_features: schema.len(),
        positive_rate: positives as f64 / y.len() as f64,
        seed: opts.seed,
        variants: metrics,
    };

    Ok(TrainOutput { artifacts, report })
}

fn fit_pipeline(
    variant: ModelVariant,
    x: &[Vec<f64>],
    y: &[u8],
    opts: &TrainOptions,
) -> Result<Pipeline, AppError> {
    match variant {
        ModelVariant::Logistic => {
            let scaler = StandardScaler::fit(x)?;
            let scaled = scaler.transform(x);
            let model = LogisticRegression::fit(&scaled, y, &opts.logistic)?;
            Ok(Pipeline {
                scaler: Some(scaler),
                classifier: Classifier::Logistic(model),
            })
        }
        ModelVariant::RandomForest => {
            let forest = RandomForest::fit(x, y, &opts.forest)?;
            Ok(Pipeline {
                scaler: None,
                classifier: Classifier::RandomForest(forest),
            })
        }
    }
}

fn evaluate(variant: ModelVariant, y: &[u8], scores: &[f64], threshold: f64) -> Result<VariantMetrics, AppError> {
    let auc = roc_auc(y, scores)
        .ok_or_else(|| AppError::data("Held-out set contains a single class; ROC-AUC is undefined."))?;
    let predicted = threshold_predictions(scores, threshold);
    let report = classification_report(y, &predicted);
    Ok(VariantMetrics {
        variant,
        roc_auc: auc,
        f1: report.positive.f1,
        recall: report.positive.recall,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SCHEMA_VERSION;

    /// Churn driven by short tenure and high charges, with some noise.
    fn table(n: usize) -> EncodedTable {
        let rows = (0..n)
            .map(|i| {
                let tenure = (i * 7 % 72) as f64;
                let charges = 20.0 + (i * 13 % 100) as f64;
                let score = charges / 120.0 - tenure / 72.0;
                let noisy = if i % 11 == 0 { -score } else { score };
                let churn = if noisy > 0.1 { 1.0 } else { 0.0 };
                vec![tenure, charges, churn]
            })
            .collect();
        EncodedTable {
            columns: vec!["tenure".into(), "MonthlyCharges".into(), "Churn".into()],
            label: "Churn".into(),
            rows,
        }
    }

    fn schema() -> FeatureSchema {
        let columns = vec!["tenure".to_string(), "MonthlyCharges".to_string()];
        FeatureSchema {
            version: SCHEMA_VERSION,
            label: "Churn".into(),
            numeric: columns.clone(),
            columns,
            categorical: Vec::new(),
        }
    }

    fn fast_opts() -> TrainOptions {
        TrainOptions {
            forest: ForestOptions {
                n_trees: 20,
                max_depth: 6,
                ..ForestOptions::default()
            },
            ..TrainOptions::default()
        }
    }

    #[test]
    fn trains_both_variants_with_useful_auc() {
        let out = train(&table(300), &schema(), &fast_opts()).unwrap();
        assert_eq!(out.artifacts.len(), 2);
        assert_eq!(out.report.n_test, 60);
        for variant in ModelVariant::ALL {
            let m = out.report.variant(variant).unwrap();
            assert!(m.roc_auc > 0.75, "{variant:?} auc {}", m.roc_auc);
            assert!((0.0..=1.0).contains(&m.f1));
        }
        let logistic = &out.artifacts[0];
        assert!(logistic.pipeline.scaler.is_some());
        assert!(out.artifacts[1].pipeline.scaler.is_none());
        logistic.validate().unwrap();
    }

    #[test]
    fn schema_drift_is_rejected_before_fitting() {
        let mut s = schema();
        s.columns.reverse();
        let err = train(&table(50), &s, &fast_opts()).unwrap_err();
        assert!(matches!(err, AppError::SchemaMismatch(_)));
    }
}
