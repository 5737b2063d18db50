//! The persisted, self-describing trained model.
//!
//! An artifact bundles the feature schema it was trained on with an optional
//! preprocessing step and the classifier. Anything that scores rows goes
//! through [`ModelArtifact::predict_proba_row`] or
//! [`ModelArtifact::predict_proba_table`], so preprocessing can't be skipped
//! and column drift is caught before it turns into wrong predictions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EncodedTable, FeatureSchema, ModelVariant, SCHEMA_VERSION};
use crate::error::AppError;
use crate::models::{LogisticRegression, ProbabilisticClassifier, RandomForest, StandardScaler};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    Logistic(LogisticRegression),
    RandomForest(RandomForest),
}

impl Classifier {
    pub fn variant(&self) -> ModelVariant {
        match self {
            Classifier::Logistic(_) => ModelVariant::Logistic,
            Classifier::RandomForest(_) => ModelVariant::RandomForest,
        }
    }
}

impl ProbabilisticClassifier for Classifier {
    fn n_features(&self) -> usize {
        match self {
            Classifier::Logistic(m) => m.n_features(),
            Classifier::RandomForest(m) => m.n_features,
        }
    }

    fn predict_proba(&self, row: &[f64]) -> f64 {
        match self {
            Classifier::Logistic(m) => m.predict_proba(row),
            Classifier::RandomForest(m) => m.predict_proba(row),
        }
    }
}

/// Preprocessing followed by a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
    pub classifier: Classifier,
}

impl Pipeline {
    /// Apply the preprocessing step (identity without a scaler).
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        match &self.scaler {
            Some(scaler) => scaler.transform_row(row),
            None => row.to_vec(),
        }
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        match &self.scaler {
            Some(scaler) => scaler.transform(rows),
            None => rows.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub variant: ModelVariant,
    pub schema: FeatureSchema,
    pub trained_at: DateTime<Utc>,
    pub pipeline: Pipeline,
}

impl ModelArtifact {
    pub fn new(schema: FeatureSchema, pipeline: Pipeline) -> Self {
        Self {
            variant: pipeline.classifier.variant(),
            schema,
            trained_at: Utc::now(),
            pipeline,
        }
    }

    pub fn n_features(&self) -> usize {
        self.schema.len()
    }

    /// Check the schema, scaler and classifier agree on the input width.
    pub fn validate(&self) -> Result<(), AppError> {
        let width = self.schema.len();
        if self.schema.version != SCHEMA_VERSION {
            return Err(AppError::model(format!(
                "artifact schema version {} is not supported (expected {SCHEMA_VERSION})",
                self.schema.version
            )));
        }
        if self.pipeline.classifier.variant() != self.variant {
            return Err(AppError::model(format!(
                "artifact is labelled `{}` but holds a `{}` classifier",
                self.variant.name(),
                self.pipeline.classifier.variant().name()
            )));
        }
        if let Some(scaler) = &self.pipeline.scaler {
            if scaler.n_features() != width || scaler.scale.len() != width {
                return Err(AppError::model(format!(
                    "scaler expects {} features but the schema has {width}",
                    scaler.n_features()
                )));
            }
        }
        let classifier_width = self.pipeline.classifier.n_features();
        if classifier_width != width {
            return Err(AppError::model(format!(
                "classifier expects {classifier_width} features but the schema has {width}"
            )));
        }
        if let Classifier::RandomForest(forest) = &self.pipeline.classifier {
            forest.validate()?;
        }
        Ok(())
    }

    /// Positive-class probability of one aligned row.
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<f64, AppError> {
        if row.len() != self.n_features() {
            return Err(AppError::model(format!(
                "model expects {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }
        let transformed = self.pipeline.transform_row(row);
        Ok(self.pipeline.classifier.predict_proba(&transformed).clamp(0.0, 1.0))
    }

    /// Score every row of `table` after checking its columns match the schema.
    pub fn predict_proba_table(&self, table: &EncodedTable) -> Result<Vec<f64>, AppError> {
        self.schema.ensure_matches(&table.feature_columns())?;
        table
            .features()?
            .iter()
            .map(|row| self.predict_proba_row(row))
            .collect()
    }
}
