//! Capture boundary definitions
//!
//! Platform-agnostic types and traits for the device capture service.
//! A `CaptureBackend` stands in for the platform media-capture layer; the
//! core only ever talks to it through `open_stream` and the track handles
//! it returns.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Which way the camera faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera (selfie)
    User,
    /// Rear camera
    Environment,
}

impl FacingMode {
    /// The opposite facing mode
    pub fn flip(self) -> Self {
        match self {
            Self::User => Self::Environment,
            Self::Environment => Self::User,
        }
    }
}

impl Default for FacingMode {
    fn default() -> Self {
        Self::User
    }
}

/// Audio processing options requested from the capture service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioProcessing {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl AudioProcessing {
    /// Full processing chain, requested with the primary constraint set
    pub fn full() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Capability constraints for opening a device stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamConstraints {
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub audio: AudioProcessing,
}

impl StreamConstraints {
    /// Primary constraint set: 720p at 30fps with full audio processing
    pub fn primary(facing: FacingMode) -> Self {
        Self {
            facing,
            width: 1280,
            height: 720,
            frame_rate: 30,
            audio: AudioProcessing::full(),
        }
    }

    /// Reduced constraint set retried when the primary set is rejected
    pub fn fallback(facing: FacingMode) -> Self {
        Self {
            facing,
            width: 640,
            height: 480,
            frame_rate: 30,
            audio: AudioProcessing::default(),
        }
    }
}

/// A single RGBA8 video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA pixels, `width * height * 4` bytes
    pub data: Arc<Vec<u8>>,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            data: Arc::new(data),
        }
    }

    /// Whether the source has started producing real frames
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Live video track: a latest-frame feed plus a stop flag
///
/// The producer keeps a clone of the `live` flag and halts once it clears.
#[derive(Debug, Clone)]
pub struct VideoTrack {
    frames: watch::Receiver<Option<VideoFrame>>,
    live: Arc<AtomicBool>,
}

impl VideoTrack {
    pub fn new(frames: watch::Receiver<Option<VideoFrame>>, live: Arc<AtomicBool>) -> Self {
        Self { frames, live }
    }

    /// Subscribe to the frame feed
    pub fn subscribe(&self) -> watch::Receiver<Option<VideoFrame>> {
        self.frames.clone()
    }

    /// Stop the track; the producer side shuts down once it observes this
    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// Opaque audio source behind one or more track handles
#[derive(Debug)]
pub struct AudioSource {
    pub id: String,
    pub label: String,
}

/// Live audio track handle, independently stoppable
#[derive(Debug, Clone)]
pub struct AudioTrack {
    source: Arc<AudioSource>,
    live: Arc<AtomicBool>,
}

impl AudioTrack {
    pub fn new(source: Arc<AudioSource>) -> Self {
        Self {
            source,
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Clone the track against the same source with its own stop flag,
    /// so stopping the original does not silence the clone
    pub fn clone_track(&self) -> AudioTrack {
        AudioTrack {
            source: self.source.clone(),
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn label(&self) -> &str {
        &self.source.label
    }

    pub fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

/// An exclusively-owned live audio+video stream from the capture hardware
#[derive(Debug)]
pub struct DeviceStream {
    video: VideoTrack,
    audio: AudioTrack,
    facing: FacingMode,
}

impl DeviceStream {
    pub fn new(video: VideoTrack, audio: AudioTrack, facing: FacingMode) -> Self {
        Self {
            video,
            audio,
            facing,
        }
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn video(&self) -> &VideoTrack {
        &self.video
    }

    pub fn audio(&self) -> &AudioTrack {
        &self.audio
    }

    /// A lendable view of this stream for the compositor or encoder.
    /// The audio side is a fresh track clone; stopping the device later
    /// does not retroactively kill a recording in flight.
    pub fn handle(&self) -> MediaStreamHandle {
        MediaStreamHandle {
            video: self.video.subscribe(),
            audio: Some(self.audio.clone_track()),
        }
    }

    /// Stop every track. Idempotent.
    pub fn stop_all_tracks(&self) {
        self.video.stop();
        self.audio.stop();
    }

    pub fn is_live(&self) -> bool {
        self.video.is_live() || self.audio.is_live()
    }
}

/// Borrowed view of a media stream, accepted by both the compositor
/// and the encoding session
#[derive(Debug, Clone)]
pub struct MediaStreamHandle {
    pub video: watch::Receiver<Option<VideoFrame>>,
    pub audio: Option<AudioTrack>,
}

/// Capture-boundary errors
#[derive(Error, Debug)]
pub enum CaptureError {
    /// Permission denied, no hardware, or no constraint set accepted
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// The requested constraint set was rejected; a reduced set may work
    #[error("constraints rejected: {0}")]
    ConstraintsRejected(String),
}

/// Platform media-capture service boundary
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire a live device stream satisfying the given constraints
    async fn open_stream(&self, constraints: &StreamConstraints)
        -> Result<DeviceStream, CaptureError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_mode_flip() {
        assert_eq!(FacingMode::User.flip(), FacingMode::Environment);
        assert_eq!(FacingMode::Environment.flip(), FacingMode::User);
    }

    #[test]
    fn test_constraint_sets() {
        let primary = StreamConstraints::primary(FacingMode::User);
        assert_eq!((primary.width, primary.height), (1280, 720));
        assert!(primary.audio.echo_cancellation);

        let fallback = StreamConstraints::fallback(FacingMode::User);
        assert_eq!((fallback.width, fallback.height), (640, 480));
        assert!(!fallback.audio.echo_cancellation);
    }

    #[test]
    fn test_audio_track_clone_is_independent() {
        let source = Arc::new(AudioSource {
            id: "mic-0".to_string(),
            label: "Built-in Microphone".to_string(),
        });
        let track = AudioTrack::new(source);
        let cloned = track.clone_track();

        track.stop();
        assert!(!track.is_live());
        assert!(cloned.is_live());
    }

    #[test]
    fn test_stop_all_tracks() {
        let (_tx, rx) = watch::channel(None);
        let live = Arc::new(AtomicBool::new(true));
        let video = VideoTrack::new(rx, live);
        let audio = AudioTrack::new(Arc::new(AudioSource {
            id: "mic-0".to_string(),
            label: "Mic".to_string(),
        }));
        let stream = DeviceStream::new(video, audio, FacingMode::User);

        assert!(stream.is_live());
        stream.stop_all_tracks();
        stream.stop_all_tracks();
        assert!(!stream.is_live());
    }
}
