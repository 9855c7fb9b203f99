//! Synthetic camera backend
//!
//! An in-process `CaptureBackend` that generates flat-color RGBA frames at
//! the requested rate. Used for demos and as the deterministic base for
//! tests; the rejection policy makes constraint fallback exercisable
//! without real hardware.

use super::traits::{
    AudioSource, AudioTrack, CaptureBackend, CaptureError, DeviceStream, FacingMode,
    StreamConstraints, VideoFrame, VideoTrack,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How the synthetic service responds to constraint sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintPolicy {
    /// Accept every request
    AcceptAll,
    /// Reject the 720p primary set, accept the reduced fallback
    RejectPrimary,
    /// Reject everything, as if permission were denied
    RejectAll,
}

/// Simulated camera producing synthetic frames
pub struct SyntheticCamera {
    policy: ConstraintPolicy,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self {
            policy: ConstraintPolicy::AcceptAll,
        }
    }

    pub fn with_policy(policy: ConstraintPolicy) -> Self {
        Self { policy }
    }

    fn make_frame(constraints: &StreamConstraints, index: u64) -> VideoFrame {
        let (w, h) = (constraints.width, constraints.height);
        // Base tint depends on facing so switched streams are tellable apart;
        // the green channel advances per frame so consecutive frames differ.
        let base: [u8; 4] = match constraints.facing {
            FacingMode::User => [200, 0, 60, 255],
            FacingMode::Environment => [20, 0, 180, 255],
        };
        let mut data = vec![0u8; (w * h * 4) as usize];
        for px in data.chunks_exact_mut(4) {
            px[0] = base[0];
            px[1] = (index % 256) as u8;
            px[2] = base[2];
            px[3] = base[3];
        }
        VideoFrame::new(w, h, data)
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureBackend for SyntheticCamera {
    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<DeviceStream, CaptureError> {
        match self.policy {
            ConstraintPolicy::RejectAll => {
                return Err(CaptureError::DeviceUnavailable(
                    "camera permission denied".to_string(),
                ));
            }
            ConstraintPolicy::RejectPrimary if constraints.width > 640 => {
                return Err(CaptureError::ConstraintsRejected(format!(
                    "{}x{} not supported",
                    constraints.width, constraints.height
                )));
            }
            _ => {}
        }

        let live = Arc::new(AtomicBool::new(true));
        // Seed the feed so consumers see a sized frame immediately.
        let (tx, rx) = watch::channel(Some(Self::make_frame(constraints, 0)));

        let producer_live = live.clone();
        let producer_constraints = constraints.clone();
        let period = Duration::from_millis(1000 / constraints.frame_rate.max(1) as u64);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            let mut index: u64 = 1;
            loop {
                ticker.tick().await;
                if !producer_live.load(Ordering::SeqCst) || tx.is_closed() {
                    break;
                }
                let _ = tx.send(Some(Self::make_frame(&producer_constraints, index)));
                index += 1;
            }
            tracing::debug!("synthetic frame producer stopped after {} frames", index);
        });

        let video = VideoTrack::new(rx, live);
        let audio = AudioTrack::new(Arc::new(AudioSource {
            id: "synthetic-mic".to_string(),
            label: "Synthetic Microphone".to_string(),
        }));

        Ok(DeviceStream::new(video, audio, constraints.facing))
    }
}
