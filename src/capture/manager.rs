//! Device stream manager
//!
//! Owns the one live camera+microphone stream. Opening a new stream always
//! releases the previous one first, so rapid open/close/switch sequences
//! can never leave two hardware locks outstanding.

use super::traits::{CaptureBackend, CaptureError, DeviceStream, FacingMode, StreamConstraints};
use std::sync::Arc;

/// Acquires and releases the device stream; handles facing switches and
/// constraint fallback.
pub struct DeviceStreamManager {
    backend: Arc<dyn CaptureBackend>,
    stream: Option<DeviceStream>,
    facing: FacingMode,
}

impl DeviceStreamManager {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            stream: None,
            facing: FacingMode::default(),
        }
    }

    /// Open a device stream for the current facing mode, releasing any
    /// previously held stream first. Retries with the reduced constraint
    /// set when the primary set is rejected.
    pub async fn open(&mut self) -> Result<(), CaptureError> {
        self.release();
        let stream = self.acquire(self.facing).await?;
        tracing::info!(facing = ?self.facing, "device stream opened");
        self.stream = Some(stream);
        Ok(())
    }

    /// Release the current stream, flip the facing mode, and re-open.
    ///
    /// On failure the flipped facing mode is kept rather than restored;
    /// the next `open` call will use it.
    pub async fn switch_facing(&mut self) -> Result<(), CaptureError> {
        self.release();
        self.facing = self.facing.flip();
        let stream = self.acquire(self.facing).await?;
        tracing::info!(facing = ?self.facing, "switched device stream");
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop every track and release the handle. Idempotent.
    pub fn close(&mut self) {
        self.release();
    }

    pub fn stream(&self) -> Option<&DeviceStream> {
        self.stream.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    async fn acquire(&self, facing: FacingMode) -> Result<DeviceStream, CaptureError> {
        match self
            .backend
            .open_stream(&StreamConstraints::primary(facing))
            .await
        {
            Ok(stream) => Ok(stream),
            Err(primary_err) => {
                tracing::warn!(
                    "primary constraints rejected ({}), retrying with fallback",
                    primary_err
                );
                self.backend
                    .open_stream(&StreamConstraints::fallback(facing))
                    .await
                    .map_err(|e| match e {
                        CaptureError::ConstraintsRejected(reason) => {
                            CaptureError::DeviceUnavailable(reason)
                        }
                        other => other,
                    })
            }
        }
    }

    fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop_all_tracks();
            tracing::debug!("released previous device stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::synthetic::{ConstraintPolicy, SyntheticCamera};
    use crate::capture::traits::{AudioSource, AudioTrack, VideoTrack};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::watch;

    /// Backend that succeeds for the first `ok_calls` opens, then fails.
    struct FlakyBackend {
        calls: AtomicUsize,
        ok_calls: usize,
    }

    #[async_trait]
    impl CaptureBackend for FlakyBackend {
        async fn open_stream(
            &self,
            constraints: &StreamConstraints,
        ) -> Result<DeviceStream, CaptureError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.ok_calls {
                return Err(CaptureError::DeviceUnavailable("gone".to_string()));
            }
            let (_tx, rx) = watch::channel(None);
            let live = Arc::new(std::sync::atomic::AtomicBool::new(true));
            Ok(DeviceStream::new(
                VideoTrack::new(rx, live),
                AudioTrack::new(Arc::new(AudioSource {
                    id: "m".to_string(),
                    label: "m".to_string(),
                })),
                constraints.facing,
            ))
        }
    }

    #[tokio::test]
    async fn test_open_releases_previous_stream() {
        let mut manager = DeviceStreamManager::new(Arc::new(SyntheticCamera::new()));

        manager.open().await.unwrap();
        let first_video = manager.stream().unwrap().video().clone();
        assert!(first_video.is_live());

        manager.open().await.unwrap();
        assert!(!first_video.is_live());
        assert!(manager.stream().unwrap().is_live());

        manager.close();
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_fallback_constraints_on_rejection() {
        let mut manager = DeviceStreamManager::new(Arc::new(SyntheticCamera::with_policy(
            ConstraintPolicy::RejectPrimary,
        )));

        manager.open().await.unwrap();
        let frame = manager
            .stream()
            .unwrap()
            .video()
            .subscribe()
            .borrow()
            .clone()
            .unwrap();
        assert_eq!((frame.width, frame.height), (640, 480));
        manager.close();
    }

    #[tokio::test]
    async fn test_device_unavailable_when_nothing_accepted() {
        let mut manager = DeviceStreamManager::new(Arc::new(SyntheticCamera::with_policy(
            ConstraintPolicy::RejectAll,
        )));

        let err = manager.open().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_switch_facing_flips_and_reopens() {
        let mut manager = DeviceStreamManager::new(Arc::new(SyntheticCamera::new()));

        manager.open().await.unwrap();
        assert_eq!(manager.facing(), FacingMode::User);

        manager.switch_facing().await.unwrap();
        assert_eq!(manager.facing(), FacingMode::Environment);
        assert_eq!(manager.stream().unwrap().facing(), FacingMode::Environment);
        manager.close();
    }

    #[tokio::test]
    async fn test_switch_failure_keeps_flipped_facing() {
        // First open succeeds (primary), the switch (primary + fallback) fails.
        let backend = FlakyBackend {
            calls: AtomicUsize::new(0),
            ok_calls: 1,
        };
        let mut manager = DeviceStreamManager::new(Arc::new(backend));

        manager.open().await.unwrap();
        let err = manager.switch_facing().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert_eq!(manager.facing(), FacingMode::Environment);
        assert!(!manager.is_open());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut manager = DeviceStreamManager::new(Arc::new(SyntheticCamera::new()));
        manager.close();
        manager.open().await.unwrap();
        manager.close();
        manager.close();
        assert!(!manager.is_open());
    }
}
