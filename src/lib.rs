//! PromptCam - webcam recording with a built-in teleprompter.
//!
//! This is the core library: device capture, live color filters, the frame
//! compositor, chunked encoding, the recording state machine, and the
//! session history with file export.

pub mod capture;
pub mod compositor;
pub mod context;
pub mod encoder;
pub mod filter;
pub mod history;
pub mod recorder;
pub mod utils;

pub use capture::{CaptureBackend, DeviceStreamManager, FacingMode, SyntheticCamera};
pub use compositor::FrameCompositor;
pub use context::SessionContext;
pub use encoder::{EncoderBackend, EncodingSession, FfmpegEncoder};
pub use filter::{builtin_filters, FilterDescriptor, FilterExpression};
pub use history::{Artifact, SessionHistory};
pub use recorder::{RecorderEvent, RecorderHandle, RecordingState, RecordingStateMachine};
pub use utils::error::{AppError, AppResult, ErrorResponse};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for binaries and integration harnesses
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "promptcam=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting PromptCam core v{}", env!("CARGO_PKG_VERSION"));
}
