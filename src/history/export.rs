//! Artifact export
//!
//! Writes the selected artifact to disk under a timestamp-derived name,
//! alongside a JSON metadata sidecar.

use super::{Artifact, HistoryError, SessionHistory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Sidecar metadata written next to the exported media file
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub id: Uuid,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub byte_length: usize,
}

impl From<&Artifact> for ArtifactMetadata {
    fn from(artifact: &Artifact) -> Self {
        Self {
            id: artifact.id,
            mime_type: artifact.mime_type.clone(),
            created_at: artifact.created_at,
            duration_secs: artifact.duration_secs,
            byte_length: artifact.len(),
        }
    }
}

/// Paths produced by a successful export
#[derive(Debug)]
pub struct ExportedFile {
    pub media_path: PathBuf,
    pub metadata_path: PathBuf,
}

/// Export the selected artifact into `dir`.
///
/// Fails with `NothingSelected` when no artifact is selected. The media
/// file name is derived from the artifact's creation timestamp with a
/// filesystem-safe format.
pub fn export_selected(history: &SessionHistory, dir: &Path) -> Result<ExportedFile, HistoryError> {
    let artifact = history.selected().ok_or(HistoryError::NothingSelected)?;

    let stem = format!("video_{}", artifact.created_at.format("%Y-%m-%d_%H-%M-%S"));
    let media_path = dir.join(format!("{}.{}", stem, artifact.extension()));
    let metadata_path = dir.join(format!("{}.json", stem));

    fs::write(&media_path, &artifact.data)?;
    let metadata = ArtifactMetadata::from(artifact.as_ref());
    fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?)?;

    tracing::info!(path = ?media_path, bytes = artifact.len(), "exported recording");

    Ok(ExportedFile {
        media_path,
        metadata_path,
    })
}
