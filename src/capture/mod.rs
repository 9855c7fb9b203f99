//! Device capture
//!
//! The capture boundary (`CaptureBackend`, stream and track handles), the
//! stream manager that owns the single live device stream, and the
//! synthetic backend used for demos and tests.

pub mod manager;
pub mod synthetic;
pub mod traits;

pub use manager::DeviceStreamManager;
pub use synthetic::{ConstraintPolicy, SyntheticCamera};
pub use traits::{
    AudioProcessing, AudioSource, AudioTrack, CaptureBackend, CaptureError, DeviceStream,
    FacingMode, MediaStreamHandle, StreamConstraints, VideoFrame, VideoTrack,
};
