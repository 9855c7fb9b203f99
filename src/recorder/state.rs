//! Recording state definitions

use serde::{Deserialize, Serialize};

/// Seconds counted down before recording begins
pub const COUNTDOWN_SECS: u8 = 3;

/// Current state of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "remaining", rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Countdown gate before recording starts
    CountingDown(u8),
    /// Actively recording
    Recording,
    /// Recording is paused
    Paused,
}

impl RecordingState {
    /// Recording or Paused: an encoding session exists
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Recording | Self::Paused)
    }

    pub fn is_counting_down(&self) -> bool {
        matches!(self, Self::CountingDown(_))
    }
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(!RecordingState::Idle.is_active());
        assert!(RecordingState::CountingDown(2).is_counting_down());
        assert!(RecordingState::Recording.is_active());
        assert!(RecordingState::Paused.is_active());
    }

    #[test]
    fn test_state_serializes_with_remaining() {
        let json = serde_json::to_string(&RecordingState::CountingDown(2)).unwrap();
        assert_eq!(json, r#"{"state":"countingdown","remaining":2}"#);
        let json = serde_json::to_string(&RecordingState::Idle).unwrap();
        assert_eq!(json, r#"{"state":"idle"}"#);
    }
}
