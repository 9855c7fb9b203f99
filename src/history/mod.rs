//! Session history
//!
//! Ordered collection of finished recordings, newest first, plus the weak
//! selection pointer used for preview and export.

pub mod export;

pub use export::{export_selected, ArtifactMetadata, ExportedFile};

use chrono::{DateTime, Utc};
use std::sync::{Arc, Weak};
use thiserror::Error;
use uuid::Uuid;

/// History-related errors
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("no recording selected")]
    NothingSelected,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),
}

/// An immutable finished recording
#[derive(Debug)]
pub struct Artifact {
    pub id: Uuid,
    /// Concatenated encoded chunks
    pub data: Vec<u8>,
    /// Negotiated MIME type
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    /// Recorded (non-paused) duration
    pub duration_secs: u64,
}

impl Artifact {
    pub fn new(data: Vec<u8>, mime_type: String, duration_secs: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            mime_type,
            created_at: Utc::now(),
            duration_secs,
        }
    }

    /// File extension for the negotiated container
    pub fn extension(&self) -> &'static str {
        if self.mime_type.starts_with("video/webm") {
            "webm"
        } else if self.mime_type.starts_with("video/mp4") {
            "mp4"
        } else {
            "bin"
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Insertion-ordered artifact list, newest first
#[derive(Debug, Default)]
pub struct SessionHistory {
    items: Vec<Arc<Artifact>>,
    selected: Option<Weak<Artifact>>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the head
    pub fn append(&mut self, artifact: Artifact) -> Arc<Artifact> {
        let artifact = Arc::new(artifact);
        tracing::info!(
            id = %artifact.id,
            bytes = artifact.len(),
            mime = %artifact.mime_type,
            "recording added to history"
        );
        self.items.insert(0, artifact.clone());
        artifact
    }

    pub fn items(&self) -> &[Arc<Artifact>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Select an artifact by id; selecting an id not in the history is a
    /// no-op. The selection is a weak lookup reference, not ownership.
    pub fn select(&mut self, id: Uuid) {
        if let Some(item) = self.items.iter().find(|a| a.id == id) {
            self.selected = Some(Arc::downgrade(item));
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<Arc<Artifact>> {
        self.selected.as_ref().and_then(Weak::upgrade)
    }
}
