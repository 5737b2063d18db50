//! Crate-wide error type.
//!
//! Every stage returns `AppError`; `main` turns it into a message on stderr and
//! a stage-specific exit code.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Missing/malformed input file or uncoercible field.
    #[error("data error: {0}")]
    Data(String),

    /// An inference row or table does not match the trained feature schema.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A model artifact is inconsistent or cannot score the given input.
    #[error("model error: {0}")]
    Model(String),

    /// A stage was run before the stage that produces its input.
    #[error("missing artifact '{path}': run `churn {stage}` first")]
    ArtifactMissing { path: String, stage: &'static str },

    /// Invalid configuration or business parameters.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(String),

    #[error("terminal error: {0}")]
    Terminal(String),
}

impl AppError {
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::Terminal(message.into())
    }

    pub fn missing(path: &Path, stage: &'static str) -> Self {
        Self::ArtifactMissing {
            path: path.display().to_string(),
            stage,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Data(_) | AppError::Config(_) | AppError::Io(_) => 2,
            AppError::SchemaMismatch(_) => 3,
            AppError::Model(_) => 4,
            AppError::ArtifactMissing { .. } => 5,
            AppError::Terminal(_) => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_artifact_names_path_and_stage() {
        let err = AppError::missing(Path::new("models/logistic.json"), "train");
        assert_eq!(err.exit_code(), 5);
        let msg = err.to_string();
        assert!(msg.contains("models/logistic.json"));
        assert!(msg.contains("churn train"));
    }

    #[test]
    fn exit_codes_follow_taxonomy() {
        assert_eq!(AppError::data("x").exit_code(), 2);
        assert_eq!(AppError::schema("x").exit_code(), 3);
        assert_eq!(AppError::model("x").exit_code(), 4);
    }
}
