//! Frame compositor
//!
//! Derives an encodable output stream from the live camera feed: a tick
//! loop samples the latest source frame at a fixed rate, draws it onto a
//! surface through the active filter, and republishes the surface as a
//! frame feed. One audio track is cloned off the source so the recorded
//! artifact carries synchronized audio.

pub mod surface;

pub use surface::{composite_frame, Surface};

use crate::capture::{AudioTrack, MediaStreamHandle, VideoFrame};
use crate::context::SessionContext;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Output frame rate of the derived stream
pub const TARGET_FPS: u32 = 30;

/// How long to wait for the source to produce a sized frame
const SOURCE_READY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("video source never produced a sized frame")]
    SourceNotReady,
}

/// A running compositing loop over one device stream
///
/// Exactly one loop may exist per open stream; `cancel` must be called
/// when recording stops or the camera closes, or the loop leaks.
#[derive(Debug)]
pub struct FrameCompositor {
    out_rx: watch::Receiver<Option<VideoFrame>>,
    audio: Option<AudioTrack>,
    cancelled: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl FrameCompositor {
    /// Start compositing from `source`, reading the active filter from
    /// `ctx` on every tick. Waits (bounded) for the source video to have
    /// non-zero dimensions before the loop begins.
    pub async fn start(
        source: MediaStreamHandle,
        ctx: Arc<SessionContext>,
    ) -> Result<Self, CompositorError> {
        let mut video = source.video;
        wait_for_sized_frame(&mut video)
            .await
            .map_err(|_| CompositorError::SourceNotReady)?;

        let audio = source.audio.as_ref().map(|track| track.clone_track());

        let (tx, out_rx) = watch::channel(None);
        let cancelled = Arc::new(AtomicBool::new(false));
        let ticks = Arc::new(AtomicU64::new(0));

        let loop_cancelled = cancelled.clone();
        let loop_ticks = ticks.clone();
        let task = tokio::spawn(async move {
            let mut surface = Surface::new();
            let mut ticker =
                tokio::time::interval(Duration::from_millis(1000 / TARGET_FPS as u64));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                // One in-flight draw at a time; the next tick is only taken
                // after this body completes.
                ticker.tick().await;
                if loop_cancelled.load(Ordering::SeqCst) || tx.is_closed() {
                    break;
                }
                let Some(frame) = video.borrow().clone() else {
                    continue;
                };
                let filter = ctx.active_filter();
                composite_frame(&mut surface, &frame, &filter.expression);
                let _ = tx.send(Some(surface.to_frame()));
                loop_ticks.fetch_add(1, Ordering::SeqCst);
            }
            tracing::debug!("compositor loop exited");
        });

        Ok(Self {
            out_rx,
            audio,
            cancelled,
            ticks,
            task,
        })
    }

    /// The derived stream: composited video plus the cloned audio track
    pub fn output(&self) -> MediaStreamHandle {
        MediaStreamHandle {
            video: self.out_rx.clone(),
            audio: self.audio.clone(),
        }
    }

    /// Stop the loop. Safe to call more than once.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.task.abort();
        if let Some(audio) = &self.audio {
            audio.stop();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Number of composited frames published so far
    pub fn frames_composited(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

async fn wait_for_sized_frame(
    video: &mut watch::Receiver<Option<VideoFrame>>,
) -> Result<(), tokio::time::error::Elapsed> {
    tokio::time::timeout(SOURCE_READY_TIMEOUT, async {
        loop {
            let ready = video
                .borrow()
                .as_ref()
                .map(|f| f.has_dimensions())
                .unwrap_or(false);
            if ready {
                return;
            }
            if video.changed().await.is_err() {
                // Producer gone; keep waiting until the timeout trips.
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{AudioSource, AudioTrack};
    use crate::filter::builtin_filters;

    fn constant_source(rgba: [u8; 4]) -> (watch::Sender<Option<VideoFrame>>, MediaStreamHandle) {
        let mut data = vec![0u8; 4 * 4 * 4];
        for px in data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        let frame = VideoFrame::new(4, 4, data);
        let (tx, rx) = watch::channel(Some(frame));
        let audio = AudioTrack::new(Arc::new(AudioSource {
            id: "mic".to_string(),
            label: "Mic".to_string(),
        }));
        (
            tx,
            MediaStreamHandle {
                video: rx,
                audio: Some(audio),
            },
        )
    }

    async fn next_output(rx: &mut watch::Receiver<Option<VideoFrame>>) -> VideoFrame {
        rx.changed().await.unwrap();
        rx.borrow().clone().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_carries_audio_and_frames() {
        let (_tx, source) = constant_source([10, 20, 30, 255]);
        let ctx = Arc::new(SessionContext::new());
        let compositor = FrameCompositor::start(source, ctx).await.unwrap();

        let output = compositor.output();
        assert!(output.audio.is_some());

        let mut rx = output.video;
        let frame = next_output(&mut rx).await;
        assert_eq!(&frame.data[..4], &[10, 20, 30, 255]);
        compositor.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_applies_on_next_tick() {
        let (_tx, source) = constant_source([200, 40, 90, 255]);
        let ctx = Arc::new(SessionContext::new());
        let compositor = FrameCompositor::start(source, ctx.clone()).await.unwrap();
        let mut rx = compositor.output().video;

        // Identity filter: frame passes through untouched.
        let frame = next_output(&mut rx).await;
        assert_eq!(&frame.data[..4], &[200, 40, 90, 255]);

        // Switch to B&W mid-loop; the very next tick reflects it.
        let bw = builtin_filters()
            .into_iter()
            .find(|f| f.id == "bw")
            .unwrap();
        ctx.set_active_filter(bw);
        let frame = next_output(&mut rx).await;
        assert_eq!(frame.data[0], frame.data[1]);
        assert_eq!(frame.data[1], frame.data[2]);

        compositor.cancel();
        assert!(compositor.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_publishing() {
        let (_tx, source) = constant_source([1, 2, 3, 255]);
        let ctx = Arc::new(SessionContext::new());
        let compositor = FrameCompositor::start(source, ctx).await.unwrap();
        let mut rx = compositor.output().video;
        next_output(&mut rx).await;

        compositor.cancel();
        let before = compositor.frames_composited();
        tokio::time::sleep(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;
        assert_eq!(compositor.frames_composited(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_without_sized_frame() {
        let (tx, rx) = watch::channel(None);
        let source = MediaStreamHandle {
            video: rx,
            audio: None,
        };
        let ctx = Arc::new(SessionContext::new());
        let err = FrameCompositor::start(source, ctx).await.unwrap_err();
        assert!(matches!(err, CompositorError::SourceNotReady));
        drop(tx);
    }
}
