//! Teleprompter scroller
//!
//! Advances the script scroll offset at a user-adjustable rate. The state
//! machine fires `tick` only while Recording, so the offset never moves
//! during countdown or pause.

use std::time::Duration;

/// Period of the scroll timer
pub const SCROLL_TICK: Duration = Duration::from_millis(50);

pub const MIN_SCROLL_SPEED: f64 = 0.5;
pub const MAX_SCROLL_SPEED: f64 = 10.0;
pub const DEFAULT_SCROLL_SPEED: f64 = 2.0;

/// Auto-scroll position and speed for the script overlay
#[derive(Debug, Clone)]
pub struct TeleprompterScroller {
    offset: f64,
    speed: f64,
}

impl TeleprompterScroller {
    pub fn new() -> Self {
        Self {
            offset: 0.0,
            speed: DEFAULT_SCROLL_SPEED,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Adjust the speed by `delta`, clamped to the allowed range.
    /// Accepted in any state; takes effect once scrolling runs again.
    pub fn adjust_speed(&mut self, delta: f64) -> f64 {
        self.speed = (self.speed + delta).clamp(MIN_SCROLL_SPEED, MAX_SCROLL_SPEED);
        self.speed
    }

    /// Advance one scroll step
    pub fn tick(&mut self) {
        self.offset += self.speed;
    }

    pub fn reset_offset(&mut self) {
        self.offset = 0.0;
    }
}

impl Default for TeleprompterScroller {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances_by_speed() {
        let mut scroller = TeleprompterScroller::new();
        scroller.tick();
        scroller.tick();
        assert_eq!(scroller.offset(), DEFAULT_SCROLL_SPEED * 2.0);
    }

    #[test]
    fn test_speed_clamped_to_range() {
        let mut scroller = TeleprompterScroller::new();
        for _ in 0..40 {
            scroller.adjust_speed(0.5);
        }
        assert_eq!(scroller.speed(), MAX_SCROLL_SPEED);

        for _ in 0..40 {
            scroller.adjust_speed(-0.5);
        }
        assert_eq!(scroller.speed(), MIN_SCROLL_SPEED);
    }

    #[test]
    fn test_adjustment_applies_on_later_ticks() {
        let mut scroller = TeleprompterScroller::new();
        scroller.tick();
        scroller.adjust_speed(0.5);
        scroller.tick();
        assert_eq!(
            scroller.offset(),
            DEFAULT_SCROLL_SPEED + DEFAULT_SCROLL_SPEED + 0.5
        );
    }
}
