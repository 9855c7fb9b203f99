//! Shared session state
//!
//! One process-wide context created on UI mount and reset on unmount:
//! the active filter, the camera-open flag, the filter-strip toggle, and
//! the transient error notice. The core reads it through accessors only;
//! there are no ambient globals.

use crate::filter::FilterDescriptor;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a transient notice stays visible
pub const NOTICE_DISMISS_AFTER: Duration = Duration::from_millis(1500);

#[derive(Debug, Default)]
struct NoticeSlot {
    generation: u64,
    message: Option<String>,
}

/// Shared UI-facing state read by the compositor and state machine
pub struct SessionContext {
    active_filter: RwLock<FilterDescriptor>,
    camera_open: AtomicBool,
    filter_mode: AtomicBool,
    notice: Mutex<NoticeSlot>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            active_filter: RwLock::new(FilterDescriptor::normal()),
            camera_open: AtomicBool::new(false),
            filter_mode: AtomicBool::new(false),
            notice: Mutex::new(NoticeSlot::default()),
        }
    }

    /// Snapshot of the currently active filter
    pub fn active_filter(&self) -> FilterDescriptor {
        self.active_filter.read().clone()
    }

    pub fn set_active_filter(&self, filter: FilterDescriptor) {
        tracing::debug!(filter = %filter.id, "active filter changed");
        *self.active_filter.write() = filter;
    }

    /// Whether the filter strip is shown / compositing is in play
    pub fn is_filter_mode(&self) -> bool {
        self.filter_mode.load(Ordering::SeqCst)
    }

    /// Toggle the filter strip; returns the new value
    pub fn toggle_filter_mode(&self) -> bool {
        !self.filter_mode.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn is_camera_open(&self) -> bool {
        self.camera_open.load(Ordering::SeqCst)
    }

    pub(crate) fn set_camera_open(&self, open: bool) {
        self.camera_open.store(open, Ordering::SeqCst);
    }

    /// Currently displayed transient notice, if any
    pub fn notice(&self) -> Option<String> {
        self.notice.lock().message.clone()
    }

    /// Post a transient notice that auto-dismisses after
    /// [`NOTICE_DISMISS_AFTER`]. A newer notice restarts the clock; a
    /// stale dismiss timer never clears it.
    pub fn set_notice(self: &Arc<Self>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("notice: {}", message);
        let generation = {
            let mut slot = self.notice.lock();
            slot.generation += 1;
            slot.message = Some(message);
            slot.generation
        };

        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(NOTICE_DISMISS_AFTER).await;
            let mut slot = ctx.notice.lock();
            if slot.generation == generation {
                slot.message = None;
            }
        });
    }

    pub fn clear_notice(&self) {
        let mut slot = self.notice.lock();
        slot.generation += 1;
        slot.message = None;
    }

    /// Teardown on UI unmount: back to defaults
    pub fn reset(&self) {
        *self.active_filter.write() = FilterDescriptor::normal();
        self.camera_open.store(false, Ordering::SeqCst);
        self.filter_mode.store(false, Ordering::SeqCst);
        self.clear_notice();
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::builtin_filters;

    #[test]
    fn test_filter_mode_toggle() {
        let ctx = SessionContext::new();
        assert!(!ctx.is_filter_mode());
        assert!(ctx.toggle_filter_mode());
        assert!(ctx.is_filter_mode());
        assert!(!ctx.toggle_filter_mode());
    }

    #[test]
    fn test_active_filter_defaults_to_identity() {
        let ctx = SessionContext::new();
        assert!(ctx.active_filter().is_identity());

        let warm = builtin_filters().into_iter().nth(1).unwrap();
        ctx.set_active_filter(warm.clone());
        assert_eq!(ctx.active_filter().id, warm.id);

        ctx.reset();
        assert!(ctx.active_filter().is_identity());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notice_auto_dismisses() {
        let ctx = Arc::new(SessionContext::new());
        ctx.set_notice("Camera access failed");
        assert_eq!(ctx.notice().as_deref(), Some("Camera access failed"));

        tokio::time::sleep(NOTICE_DISMISS_AFTER + Duration::from_millis(100)).await;
        tokio::task::yield_now().await;
        assert_eq!(ctx.notice(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_notice_survives_stale_timer() {
        let ctx = Arc::new(SessionContext::new());
        ctx.set_notice("first");
        tokio::time::sleep(Duration::from_millis(1000)).await;
        ctx.set_notice("second");

        // The first notice's timer fires now; "second" must survive it.
        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        assert_eq!(ctx.notice().as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(ctx.notice(), None);
    }
}
