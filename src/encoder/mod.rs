//! Chunked encoding
//!
//! The encoder boundary (`EncoderBackend` / `MediaEncoder`), MIME type
//! negotiation over the preference list, and the `EncodingSession` that
//! accumulates chunks into a finished artifact.

pub mod ffmpeg;
pub mod session;

pub use ffmpeg::FfmpegEncoder;
pub use session::{EncodingSession, SessionState};

use crate::capture::MediaStreamHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Encoding formats tried in descending preference order
pub const MIME_PREFERENCES: [&str; 4] = [
    "video/webm;codecs=h264,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm",
    "video/mp4",
];

/// How often an active encoder emits a chunk
pub const DEFAULT_TIMESLICE: Duration = Duration::from_secs(1);

/// Encoder configuration handed to the backend
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub mime_type: String,
    pub video_bits_per_second: u32,
    pub audio_bits_per_second: u32,
    pub timeslice: Duration,
}

impl EncoderOptions {
    pub fn new(mime_type: String) -> Self {
        Self {
            mime_type,
            video_bits_per_second: 2_500_000,
            audio_bits_per_second: 128_000,
            timeslice: DEFAULT_TIMESLICE,
        }
    }
}

/// An incremental unit of encoded media
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
}

impl EncodedChunk {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Events emitted by a running encoder, in strict temporal order
#[derive(Debug)]
pub enum EncoderEvent {
    Chunk(EncodedChunk),
    /// Final event after `stop`; no chunks follow
    Stopped,
}

/// Encoder-boundary errors
#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("no supported recording format found")]
    NoSupportedFormat,

    #[error("encoder failed: {0}")]
    Backend(String),
}

/// Sender half of an encoder's event channel
pub type EncoderEventSender = mpsc::UnboundedSender<EncoderEvent>;

/// Platform chunked-encoder boundary
pub trait EncoderBackend: Send + Sync {
    /// Whether the platform accepts this MIME type
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Build an encoder bound to `stream`; events flow through `events`
    fn create(
        &self,
        stream: MediaStreamHandle,
        options: EncoderOptions,
        events: EncoderEventSender,
    ) -> Result<Box<dyn MediaEncoder>, EncoderError>;
}

/// A created encoder instance
pub trait MediaEncoder: Send {
    /// Begin emitting chunks every timeslice
    fn start(&mut self);
    /// Halt chunk production without finalizing
    fn pause(&mut self);
    fn resume(&mut self);
    /// Flush the in-flight chunk immediately
    fn request_data(&mut self);
    /// Finalize: flush remaining data, then emit `Stopped`
    fn stop(&mut self);
}

/// Pick the first MIME type in the preference list the backend accepts
pub fn negotiate_format(backend: &dyn EncoderBackend) -> Result<String, EncoderError> {
    MIME_PREFERENCES
        .iter()
        .find(|mime| backend.is_type_supported(mime))
        .map(|mime| {
            tracing::debug!(mime, "negotiated recording format");
            mime.to_string()
        })
        .ok_or(EncoderError::NoSupportedFormat)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic encoder double used across the crate's tests.

    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;

    pub struct FakeEncoderBackend {
        supported: Vec<String>,
    }

    impl FakeEncoderBackend {
        /// Supports everything from the second preference down, so
        /// negotiation exercises the fallback step.
        pub fn new() -> Self {
            Self {
                supported: MIME_PREFERENCES[1..].iter().map(|m| m.to_string()).collect(),
            }
        }

        pub fn supporting(mimes: &[&str]) -> Self {
            Self {
                supported: mimes.iter().map(|m| m.to_string()).collect(),
            }
        }
    }

    impl EncoderBackend for FakeEncoderBackend {
        fn is_type_supported(&self, mime_type: &str) -> bool {
            self.supported.iter().any(|m| m == mime_type)
        }

        fn create(
            &self,
            _stream: MediaStreamHandle,
            options: EncoderOptions,
            events: EncoderEventSender,
        ) -> Result<Box<dyn MediaEncoder>, EncoderError> {
            Ok(Box::new(FakeMediaEncoder {
                shared: Arc::new(FakeShared {
                    paused: AtomicBool::new(false),
                    stopped: AtomicBool::new(false),
                    seq: AtomicU32::new(0),
                }),
                timeslice: options.timeslice,
                events,
            }))
        }
    }

    struct FakeShared {
        paused: AtomicBool,
        stopped: AtomicBool,
        seq: AtomicU32,
    }

    impl FakeShared {
        fn emit(&self, events: &EncoderEventSender) {
            let seq = self.seq.fetch_add(1, Ordering::SeqCst);
            let _ = events.send(EncoderEvent::Chunk(EncodedChunk {
                data: format!("chunk-{:03};", seq).into_bytes(),
            }));
        }
    }

    pub struct FakeMediaEncoder {
        shared: Arc<FakeShared>,
        timeslice: Duration,
        events: EncoderEventSender,
    }

    impl MediaEncoder for FakeMediaEncoder {
        fn start(&mut self) {
            let shared = self.shared.clone();
            let events = self.events.clone();
            let timeslice = self.timeslice;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(timeslice);
                ticker.tick().await; // immediate first tick
                loop {
                    ticker.tick().await;
                    if shared.stopped.load(Ordering::SeqCst) || events.is_closed() {
                        break;
                    }
                    if !shared.paused.load(Ordering::SeqCst) {
                        shared.emit(&events);
                    }
                }
            });
        }

        fn pause(&mut self) {
            self.shared.paused.store(true, Ordering::SeqCst);
        }

        fn resume(&mut self) {
            self.shared.paused.store(false, Ordering::SeqCst);
        }

        fn request_data(&mut self) {
            if !self.shared.stopped.load(Ordering::SeqCst) {
                self.shared.emit(&self.events);
            }
        }

        fn stop(&mut self) {
            if !self.shared.stopped.swap(true, Ordering::SeqCst) {
                self.shared.emit(&self.events);
                let _ = self.events.send(EncoderEvent::Stopped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeEncoderBackend;
    use super::*;

    #[test]
    fn test_negotiation_picks_first_supported() {
        let backend = FakeEncoderBackend::new();
        let mime = negotiate_format(&backend).unwrap();
        assert_eq!(mime, "video/webm;codecs=vp8,opus");
    }

    #[test]
    fn test_negotiation_fails_closed() {
        let backend = FakeEncoderBackend::supporting(&[]);
        assert!(matches!(
            negotiate_format(&backend),
            Err(EncoderError::NoSupportedFormat)
        ));
    }

    #[test]
    fn test_negotiation_generic_fallback() {
        let backend = FakeEncoderBackend::supporting(&["video/mp4"]);
        assert_eq!(negotiate_format(&backend).unwrap(), "video/mp4");
    }
}
