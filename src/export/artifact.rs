//! Binary artifact persistence
//!
//! A run produces two files: the bincode-encoded [`FittedPipeline`] and a
//! bincode-encoded [`ArtifactMetadata`] record. Both are staged as temporary
//! files next to their targets and renamed into place only after both have
//! been written, so a failed run never leaves a half-written pair behind.

use crate::error::{Result, SelectError};
use crate::training::FittedPipeline;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Metadata record stored alongside the fitted pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub timestamp: DateTime<Utc>,
    pub source_path: String,
    pub duplicate_rows_removed: usize,
    /// Column order the estimator expects; authoritative for callers
    pub feature_column_order: Vec<String>,
    pub selected_model_name: String,
    pub cv_mean_accuracy: f64,
    pub cv_std_accuracy: f64,
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub cv_train_mean_accuracy: f64,
    pub sample_count: usize,
    pub random_seed: u64,
}

impl ArtifactMetadata {
    /// Order one input record by `feature_column_order`.
    ///
    /// Extra keys are ignored. Fails with `MissingFeatures` naming every absent column.
    pub fn arrange_features(&self, record: &HashMap<String, f64>) -> Result<Array2<f64>> {
        let missing: Vec<String> = self
            .feature_column_order
            .iter()
            .filter(|name| !record.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(SelectError::MissingFeatures(missing));
        }

        let row: Vec<f64> = self
            .feature_column_order
            .iter()
            .filter_map(|name| record.get(name).copied())
            .collect();
        Ok(Array2::from_shape_vec((1, row.len()), row)?)
    }
}

/// Fitted pipeline plus its metadata, as read back from disk
#[derive(Debug, Clone)]
pub struct Artifact {
    pub model: FittedPipeline,
    pub metadata: ArtifactMetadata,
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Confirm a file can be created in the directory of `path`
pub fn check_writable(path: &Path) -> Result<()> {
    let dir = parent_dir(path);
    NamedTempFile::new_in(&dir).map(drop).map_err(|e| {
        SelectError::persistence(
            "preflight",
            format!("cannot write to {}: {}", dir.display(), e),
        )
    })
}

fn stage(bytes: &[u8], target: &Path) -> Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(parent_dir(target))
        .map_err(|e| SelectError::persistence("staging", format!("{}: {}", target.display(), e)))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| SelectError::persistence("staging", format!("{}: {}", target.display(), e)))?;
    Ok(tmp)
}

/// Write both artifact files, or neither.
pub fn persist_artifacts(
    model: &FittedPipeline,
    metadata: &ArtifactMetadata,
    model_path: &Path,
    metadata_path: &Path,
) -> Result<()> {
    let model_bytes =
        bincode::serialize(model).map_err(|e| SelectError::persistence("serialize model", e))?;
    let metadata_bytes = bincode::serialize(metadata)
        .map_err(|e| SelectError::persistence("serialize metadata", e))?;

    let model_tmp = stage(&model_bytes, model_path)?;
    let metadata_tmp = stage(&metadata_bytes, metadata_path)?;

    model_tmp
        .persist(model_path)
        .map_err(|e| SelectError::persistence("rename model", e.error))?;

    if let Err(e) = metadata_tmp.persist(metadata_path) {
        if let Err(cleanup) = fs::remove_file(model_path) {
            warn!(path = %model_path.display(), error = %cleanup, "Could not remove orphaned model file");
        }
        return Err(SelectError::persistence("rename metadata", e.error));
    }

    info!(
        model = %model_path.display(),
        metadata = %metadata_path.display(),
        bytes = model_bytes.len() + metadata_bytes.len(),
        "Artifacts written"
    );
    Ok(())
}

fn read_bincode<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| {
        SelectError::DataNotFound(format!("{}: {}", path.display(), e))
    })?;
    bincode::deserialize(&bytes).map_err(|e| {
        SelectError::SerializationError(format!("{}: {}", path.display(), e))
    })
}

/// Read a persisted pipeline and its metadata
pub fn load_artifact(model_path: impl AsRef<Path>, metadata_path: impl AsRef<Path>) -> Result<Artifact> {
    Ok(Artifact {
        model: read_bincode(model_path.as_ref())?,
        metadata: read_bincode(metadata_path.as_ref())?,
    })
}
