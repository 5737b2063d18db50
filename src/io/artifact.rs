//! Read/write JSON artifacts.
//!
//! Model artifacts, the train report and the explanation summary all share
//! this path: pretty JSON written atomically, read back with a clear
//! "run stage X first" error when the file does not exist yet.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::io::export::write_atomic;
use crate::models::ModelArtifact;

/// Serialize `value` as pretty JSON at `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| AppError::io(format!("Failed to encode JSON for '{}': {e}", path.display())))?;
    write_atomic(path, &bytes)
}

/// Read a JSON artifact produced by `stage`.
pub fn read_json<T: DeserializeOwned>(path: &Path, stage: &'static str) -> Result<T, AppError> {
    if !path.exists() {
        return Err(AppError::missing(path, stage));
    }
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::data(format!("Invalid JSON in '{}': {e}", path.display())))
}

pub fn write_model_artifact(path: &Path, artifact: &ModelArtifact) -> Result<(), AppError> {
    write_json(path, artifact)
}

/// Load a model artifact and check its internal consistency.
pub fn read_model_artifact(path: &Path) -> Result<ModelArtifact, AppError> {
    let artifact: ModelArtifact = read_json(path, "train")?;
    artifact.validate()?;
    Ok(artifact)
}
