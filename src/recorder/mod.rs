//! Recording orchestration
//!
//! The recording lifecycle (Idle, countdown gate, Recording, Paused), the
//! machine that drives it, and the teleprompter scroller that runs in step
//! with it.

pub mod machine;
pub mod state;
pub mod teleprompter;

pub use machine::{RecorderError, RecorderEvent, RecorderHandle, RecordingStateMachine};
pub use state::{RecordingState, COUNTDOWN_SECS};
pub use teleprompter::{TeleprompterScroller, DEFAULT_SCROLL_SPEED, MAX_SCROLL_SPEED, MIN_SCROLL_SPEED, SCROLL_TICK};
