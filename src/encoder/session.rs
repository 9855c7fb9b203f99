//! Encoding session
//!
//! Wraps one chunked encoder bound to an input stream. Accumulates chunks
//! in arrival order and assembles them, exactly once, into an artifact on
//! stop. Aborted sessions discard their chunks instead.

use super::{
    negotiate_format, EncodedChunk, EncoderBackend, EncoderError, EncoderEvent, EncoderOptions,
    MediaEncoder,
};
use crate::capture::MediaStreamHandle;
use crate::history::Artifact;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Activity state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Recording,
    Paused,
}

/// One recording cycle's encoder wrapper
pub struct EncodingSession {
    backend: Arc<dyn EncoderBackend>,
    encoder: Option<Box<dyn MediaEncoder>>,
    events: Option<mpsc::UnboundedReceiver<EncoderEvent>>,
    chunks: Vec<EncodedChunk>,
    mime_type: Option<String>,
    state: SessionState,
}

impl EncodingSession {
    pub fn new(backend: Arc<dyn EncoderBackend>) -> Self {
        Self {
            backend,
            encoder: None,
            events: None,
            chunks: Vec::new(),
            mime_type: None,
            state: SessionState::Inactive,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Inactive
    }

    /// Negotiated MIME type of the running session
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Negotiate a format and begin encoding `stream`. Chunks are emitted
    /// on the backend's timeslice cadence rather than only at the end.
    pub fn start(&mut self, stream: MediaStreamHandle) -> Result<(), EncoderError> {
        if self.is_active() {
            tracing::warn!("start called on active encoding session, ignoring");
            return Ok(());
        }

        let mime_type = negotiate_format(&*self.backend)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut encoder = self
            .backend
            .create(stream, EncoderOptions::new(mime_type.clone()), tx)?;
        encoder.start();

        self.encoder = Some(encoder);
        self.events = Some(rx);
        self.chunks.clear();
        self.mime_type = Some(mime_type);
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Pause chunk production. Flushes the in-flight chunk first so pausing
    /// never silently drops buffered data. No-op outside Recording.
    pub fn pause(&mut self) {
        if self.state != SessionState::Recording {
            return;
        }
        if let Some(encoder) = &mut self.encoder {
            encoder.request_data();
            encoder.pause();
        }
        self.pump();
        self.state = SessionState::Paused;
    }

    /// No-op outside Paused.
    pub fn resume(&mut self) {
        if self.state != SessionState::Paused {
            return;
        }
        if let Some(encoder) = &mut self.encoder {
            encoder.resume();
        }
        self.state = SessionState::Recording;
    }

    /// Drain any pending chunk events into the accumulator, preserving
    /// arrival order.
    pub fn pump(&mut self) {
        if let Some(events) = &mut self.events {
            while let Ok(event) = events.try_recv() {
                if let EncoderEvent::Chunk(chunk) = event {
                    self.chunks.push(chunk);
                }
            }
        }
    }

    /// Finalize the session: flush, halt, and assemble the accumulated
    /// chunks into an artifact tagged with the negotiated MIME type.
    /// Returns `None` when called while inactive or when no chunk was
    /// ever produced.
    pub async fn stop(&mut self, duration_secs: u64) -> Option<Artifact> {
        if !self.is_active() {
            return None;
        }
        self.state = SessionState::Inactive;

        if let Some(mut encoder) = self.encoder.take() {
            encoder.stop();
        }
        if let Some(mut events) = self.events.take() {
            // Drain until the encoder's final event; order is preserved.
            while let Some(event) = events.recv().await {
                match event {
                    EncoderEvent::Chunk(chunk) => self.chunks.push(chunk),
                    EncoderEvent::Stopped => break,
                }
            }
        }

        let mime_type = self.mime_type.take()?;
        if self.chunks.is_empty() {
            tracing::warn!("recording stopped with no chunks, no artifact produced");
            return None;
        }

        let mut data = Vec::with_capacity(self.chunks.iter().map(EncodedChunk::len).sum());
        for chunk in self.chunks.drain(..) {
            data.extend_from_slice(&chunk.data);
        }
        tracing::info!(bytes = data.len(), mime = %mime_type, "assembled recording artifact");
        Some(Artifact::new(data, mime_type, duration_secs))
    }

    /// Discard the session without producing an artifact. Partial chunks
    /// from an aborted recording are never assembled.
    pub fn abort(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            encoder.stop();
        }
        self.events = None;
        if !self.chunks.is_empty() {
            tracing::info!(discarded = self.chunks.len(), "aborted session, chunks dropped");
        }
        self.chunks.clear();
        self.mime_type = None;
        self.state = SessionState::Inactive;
    }
}
