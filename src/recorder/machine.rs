//! Recording state machine
//!
//! Orchestrates the countdown gate, the encoding session, the compositor
//! loop, and the teleprompter in lockstep. All three timers (countdown,
//! elapsed time, scroll) are owned as one set and cleared synchronously
//! with every state exit, so no timer can outlive the state that armed it.

use super::state::{RecordingState, COUNTDOWN_SECS};
use super::teleprompter::{TeleprompterScroller, SCROLL_TICK};
use crate::capture::{CaptureBackend, CaptureError, DeviceStreamManager};
use crate::compositor::FrameCompositor;
use crate::context::SessionContext;
use crate::encoder::{EncoderBackend, EncodingSession};
use crate::history::{Artifact, SessionHistory};
use std::sync::{Arc, Weak};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;

/// Recorder-level errors
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("no active stream found")]
    NoActiveStream,

    #[error("recording already in progress")]
    AlreadyRecording,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Events emitted during a recording session
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    CameraOpened,
    CameraClosed,
    /// Countdown value after a tick
    CountdownTick(u8),
    Started,
    Paused,
    Resumed,
    Stopped,
    Error(String),
}

/// Timer tasks armed for the current state, cleared as a unit
#[derive(Default)]
struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    fn clear(&mut self) {
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

/// The recording session orchestrator
pub struct RecordingStateMachine {
    context: Arc<SessionContext>,
    devices: DeviceStreamManager,
    session: EncodingSession,
    compositor: Option<FrameCompositor>,
    teleprompter: TeleprompterScroller,
    history: SessionHistory,
    state: RecordingState,
    elapsed_secs: u64,
    timers: TimerSet,
    event_tx: broadcast::Sender<RecorderEvent>,
    /// Present only when driven through a `RecorderHandle`; without it
    /// the tick entry points are the caller's responsibility.
    self_ref: Option<Weak<Mutex<RecordingStateMachine>>>,
}

impl RecordingStateMachine {
    pub fn new(
        capture: Arc<dyn CaptureBackend>,
        encoder: Arc<dyn EncoderBackend>,
        context: Arc<SessionContext>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            context,
            devices: DeviceStreamManager::new(capture),
            session: EncodingSession::new(encoder),
            compositor: None,
            teleprompter: TeleprompterScroller::new(),
            history: SessionHistory::new(),
            state: RecordingState::Idle,
            elapsed_secs: 0,
            timers: TimerSet::default(),
            event_tx,
            self_ref: None,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Seconds spent in Recording (pauses excluded) this cycle
    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn history(&self) -> &SessionHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut SessionHistory {
        &mut self.history
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn is_camera_open(&self) -> bool {
        self.devices.is_open()
    }

    pub fn scroll_offset(&self) -> f64 {
        self.teleprompter.offset()
    }

    /// Speed changes are accepted in any state and take effect while
    /// Recording.
    pub fn adjust_scroll_speed(&mut self, delta: f64) -> f64 {
        self.teleprompter.adjust_speed(delta)
    }

    /// Subscribe to recorder events
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: RecorderEvent) {
        let _ = self.event_tx.send(event);
    }

    fn notify_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.context.set_notice(message.clone());
        self.emit(RecorderEvent::Error(message));
    }

    /// Open the device stream for the current facing mode
    pub async fn open_camera(&mut self) -> Result<(), RecorderError> {
        if let Err(e) = self.devices.open().await {
            self.notify_error("Camera access failed. Please check camera permissions and try again.");
            return Err(e.into());
        }
        self.context.set_camera_open(true);
        self.emit(RecorderEvent::CameraOpened);
        Ok(())
    }

    /// Flip between front and back camera. Only valid while Idle.
    pub async fn switch_camera(&mut self) -> Result<(), RecorderError> {
        if self.state != RecordingState::Idle {
            return Err(RecorderError::AlreadyRecording);
        }
        if let Err(e) = self.devices.switch_facing().await {
            // The old stream is already released; the camera is closed now.
            self.context.set_camera_open(false);
            self.notify_error("Failed to switch camera. Please try again.");
            return Err(e.into());
        }
        self.emit(RecorderEvent::CameraOpened);
        Ok(())
    }

    /// Force-stop everything and release the device stream.
    ///
    /// Teardown order is load-bearing: compositor loop, then encoder
    /// (partial chunks discarded), then timers, then device tracks, then
    /// state reset.
    pub fn close_camera(&mut self) {
        if let Some(compositor) = self.compositor.take() {
            compositor.cancel();
        }
        self.session.abort();
        self.timers.clear();
        self.devices.close();
        self.teleprompter.reset_offset();
        self.elapsed_secs = 0;
        self.state = RecordingState::Idle;
        self.context.set_camera_open(false);
        self.context.clear_notice();
        self.emit(RecorderEvent::CameraClosed);
        tracing::info!("camera closed, session reset");
    }

    /// Request a recording: enters the countdown gate.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if !self.devices.is_open() {
            self.notify_error("No active stream found");
            return Err(RecorderError::NoActiveStream);
        }
        if self.state != RecordingState::Idle {
            return Err(RecorderError::AlreadyRecording);
        }
        self.state = RecordingState::CountingDown(COUNTDOWN_SECS);
        self.emit(RecorderEvent::CountdownTick(COUNTDOWN_SECS));
        self.timers.clear();
        self.spawn_countdown_timer();
        tracing::info!("countdown started");
        Ok(())
    }

    /// One 1-second countdown tick. At zero, recording begins.
    pub async fn tick_countdown(&mut self) {
        let RecordingState::CountingDown(remaining) = self.state else {
            return;
        };
        if remaining > 0 {
            self.state = RecordingState::CountingDown(remaining - 1);
            self.emit(RecorderEvent::CountdownTick(remaining - 1));
        } else {
            self.begin_recording().await;
        }
    }

    async fn begin_recording(&mut self) {
        let Some(stream) = self.devices.stream() else {
            self.state = RecordingState::Idle;
            self.notify_error("No active stream found");
            return;
        };
        let raw = stream.handle();

        let input = if self.context.is_filter_mode() {
            match FrameCompositor::start(raw, self.context.clone()).await {
                Ok(compositor) => {
                    let output = compositor.output();
                    self.compositor = Some(compositor);
                    output
                }
                Err(e) => {
                    self.state = RecordingState::Idle;
                    self.notify_error(format!("Failed to start recording: {}", e));
                    return;
                }
            }
        } else {
            raw
        };

        if let Err(e) = self.session.start(input) {
            if let Some(compositor) = self.compositor.take() {
                compositor.cancel();
            }
            self.state = RecordingState::Idle;
            self.notify_error(format!("Failed to start recording: {}", e));
            return;
        }

        self.elapsed_secs = 0;
        self.teleprompter.reset_offset();
        self.state = RecordingState::Recording;
        self.timers.clear();
        self.spawn_recording_timers();
        self.emit(RecorderEvent::Started);
        tracing::info!(mime = ?self.session.mime_type(), "recording started");
    }

    /// Pause. Silent no-op outside Recording.
    pub fn pause(&mut self) {
        if self.state != RecordingState::Recording {
            return;
        }
        self.session.pause();
        self.timers.clear();
        self.state = RecordingState::Paused;
        self.emit(RecorderEvent::Paused);
        tracing::info!("recording paused at {}s", self.elapsed_secs);
    }

    /// Resume. Silent no-op outside Paused.
    pub fn resume(&mut self) {
        if self.state != RecordingState::Paused {
            return;
        }
        self.session.resume();
        self.state = RecordingState::Recording;
        self.spawn_recording_timers();
        self.emit(RecorderEvent::Resumed);
        tracing::info!("recording resumed at {}s", self.elapsed_secs);
    }

    /// Stop the current cycle.
    ///
    /// From Recording/Paused the session is finalized and the artifact
    /// (if any chunks were produced) is appended to the history. A stop
    /// during the countdown aborts it outright: back to Idle, nothing
    /// recorded. Stopping while Idle is a no-op.
    pub async fn stop(&mut self) -> Option<Arc<Artifact>> {
        match self.state {
            RecordingState::Idle => None,
            RecordingState::CountingDown(_) => {
                self.timers.clear();
                self.state = RecordingState::Idle;
                tracing::info!("countdown aborted");
                None
            }
            RecordingState::Recording | RecordingState::Paused => {
                self.timers.clear();
                if let Some(compositor) = self.compositor.take() {
                    compositor.cancel();
                }
                let duration = self.elapsed_secs;
                let artifact = self.session.stop(duration).await;
                self.elapsed_secs = 0;
                self.teleprompter.reset_offset();
                self.state = RecordingState::Idle;
                self.emit(RecorderEvent::Stopped);
                tracing::info!(duration_secs = duration, "recording stopped");
                artifact.map(|a| self.history.append(a))
            }
        }
    }

    /// One 1-second elapsed-time tick; counts only while Recording.
    pub fn tick_elapsed(&mut self) {
        if self.state == RecordingState::Recording {
            self.elapsed_secs += 1;
            self.session.pump();
        }
    }

    /// One teleprompter scroll tick; moves only while Recording.
    pub fn tick_scroll(&mut self) {
        if self.state == RecordingState::Recording {
            self.teleprompter.tick();
        }
    }

    fn spawn_countdown_timer(&mut self) {
        let Some(weak) = self.self_ref.clone() else {
            return;
        };
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(machine) = weak.upgrade() else { break };
                let mut guard = machine.lock().await;
                if !guard.state.is_counting_down() {
                    break;
                }
                guard.tick_countdown().await;
            }
        });
        self.timers.push(handle);
    }

    fn spawn_recording_timers(&mut self) {
        let Some(weak) = self.self_ref.clone() else {
            return;
        };

        let elapsed_weak = weak.clone();
        let elapsed = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(machine) = elapsed_weak.upgrade() else { break };
                let mut guard = machine.lock().await;
                if guard.state != RecordingState::Recording {
                    break;
                }
                guard.tick_elapsed();
            }
        });
        self.timers.push(elapsed);

        let scroll = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SCROLL_TICK);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(machine) = weak.upgrade() else { break };
                let mut guard = machine.lock().await;
                if guard.state != RecordingState::Recording {
                    break;
                }
                guard.tick_scroll();
            }
        });
        self.timers.push(scroll);
    }
}

/// Shareable handle driving the state machine with real timers
#[derive(Clone)]
pub struct RecorderHandle {
    inner: Arc<Mutex<RecordingStateMachine>>,
}

impl RecorderHandle {
    pub fn new(
        capture: Arc<dyn CaptureBackend>,
        encoder: Arc<dyn EncoderBackend>,
        context: Arc<SessionContext>,
    ) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Mutex<RecordingStateMachine>>| {
            let mut machine = RecordingStateMachine::new(capture, encoder, context);
            machine.self_ref = Some(weak.clone());
            Mutex::new(machine)
        });
        Self { inner }
    }

    /// Direct access for anything without a convenience method
    pub async fn lock(&self) -> MutexGuard<'_, RecordingStateMachine> {
        self.inner.lock().await
    }

    pub async fn open_camera(&self) -> Result<(), RecorderError> {
        self.inner.lock().await.open_camera().await
    }

    pub async fn switch_camera(&self) -> Result<(), RecorderError> {
        self.inner.lock().await.switch_camera().await
    }

    pub async fn close_camera(&self) {
        self.inner.lock().await.close_camera();
    }

    pub async fn start(&self) -> Result<(), RecorderError> {
        self.inner.lock().await.start()
    }

    pub async fn pause(&self) {
        self.inner.lock().await.pause();
    }

    pub async fn resume(&self) {
        self.inner.lock().await.resume();
    }

    pub async fn stop(&self) -> Option<Arc<Artifact>> {
        self.inner.lock().await.stop().await
    }

    pub async fn state(&self) -> RecordingState {
        self.inner.lock().await.state()
    }

    pub async fn elapsed_secs(&self) -> u64 {
        self.inner.lock().await.elapsed_secs()
    }

    pub async fn scroll_offset(&self) -> f64 {
        self.inner.lock().await.scroll_offset()
    }

    pub async fn adjust_scroll_speed(&self, delta: f64) -> f64 {
        self.inner.lock().await.adjust_scroll_speed(delta)
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.inner.lock().await.subscribe()
    }
}
