//! Locally ticking turn countdown with authoritative corrections.
//!
//! Local ticks exist only so the display moves smoothly between
//! `timer_update` pushes. Reaching zero never ends a turn; only
//! `turn_ended` does.

/// Default turn length in seconds.
pub const DEFAULT_TURN_DURATION_SECS: u32 = 60;

/// At or below this many seconds the timer is shown as a warning.
pub const WARNING_THRESHOLD_SECS: u32 = 10;

/// Turn countdown.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerSync {
    remaining: u32,
    active: bool,
}

impl TimerSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh countdown at turn start.
    pub fn start(&mut self, seconds: u32) {
        self.remaining = seconds;
        self.active = true;
    }

    /// One local second passed. Saturates at zero.
    ///
    /// Returns the new value, or `None` if the timer is stopped.
    pub fn tick(&mut self) -> Option<u32> {
        if !self.active {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        Some(self.remaining)
    }

    /// Overwrite with the relay's value. Also activates a stopped timer, so a
    /// client that rejoined mid-turn picks the countdown up.
    pub fn correct(&mut self, seconds: u32) {
        if self.active && seconds > self.remaining {
            tracing::debug!(local = self.remaining, relay = seconds, "timer corrected upward");
        }
        self.remaining = seconds;
        self.active = true;
    }

    /// Freeze the countdown. The last value stays readable.
    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` while a running timer is at or below the warning
    /// threshold, whatever set the current value.
    pub fn is_warning(&self) -> bool {
        self.active && self.remaining <= WARNING_THRESHOLD_SECS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_never_go_below_zero() {
        let mut timer = TimerSync::new();
        timer.start(2);
        assert_eq!(timer.tick(), Some(1));
        assert_eq!(timer.tick(), Some(0));
        assert_eq!(timer.tick(), Some(0));
        assert!(timer.is_active());
    }

    #[test]
    fn correction_overrides_local_ticks() {
        let mut timer = TimerSync::new();
        timer.start(DEFAULT_TURN_DURATION_SECS);
        for _ in 0..5 {
            timer.tick();
        }
        timer.correct(57);
        assert_eq!(timer.remaining(), 57);
        timer.correct(40);
        assert_eq!(timer.remaining(), 40);
    }

    #[test]
    fn warning_depends_only_on_value() {
        let mut timer = TimerSync::new();
        timer.start(11);
        assert!(!timer.is_warning());
        timer.tick();
        assert!(timer.is_warning());

        timer.correct(30);
        assert!(!timer.is_warning());
        timer.correct(10);
        assert!(timer.is_warning());
    }

    #[test]
    fn stopped_timer_ignores_ticks() {
        let mut timer = TimerSync::new();
        assert_eq!(timer.tick(), None);
        timer.start(5);
        timer.stop();
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining(), 5);
        assert!(!timer.is_warning());
    }
}
