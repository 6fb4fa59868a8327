//! Pausable countdown timer.
//!
//! The timer is advanced once per tick by the simulation. It never fires a
//! callback itself; [`CountdownTimer::advance`] reports the tick on which it
//! expired and the caller decides what to do.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Countdown length used when a level doesn't set its own (seconds).
    pub duration_secs: f32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            duration_secs: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerStatus {
    /// Not started, or stopped before expiring.
    #[default]
    Stopped,
    Running,
    Paused,
    Expired,
}

/// Result of advancing the timer by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Still counting, or paused, or stopped.
    Idle,
    /// Time ran out during this tick. Reported once.
    Expired,
}

#[derive(Debug, Clone, Default)]
pub struct CountdownTimer {
    remaining: f32,
    status: TimerStatus,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down from `duration_secs`.
    pub fn start(&mut self, duration_secs: f32) {
        self.remaining = duration_secs.max(0.0);
        self.status = TimerStatus::Running;
        log::debug!("timer started: {duration_secs}s");
    }

    /// Stop without expiring. Later ticks do nothing.
    pub fn stop(&mut self) {
        if self.status != TimerStatus::Expired {
            self.status = TimerStatus::Stopped;
        }
    }

    pub fn pause(&mut self) {
        if self.status == TimerStatus::Running {
            self.status = TimerStatus::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.status == TimerStatus::Paused {
            self.status = TimerStatus::Running;
        }
    }

    /// Flip between running and paused. Returns whether the timer is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        match self.status {
            TimerStatus::Running => self.pause(),
            TimerStatus::Paused => self.resume(),
            TimerStatus::Stopped | TimerStatus::Expired => {}
        }
        self.is_paused()
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_paused(&self) -> bool {
        self.status == TimerStatus::Paused
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    /// Whole seconds left, as shown on the HUD.
    pub fn seconds_left(&self) -> u32 {
        self.remaining.max(0.0).floor() as u32
    }

    /// HUD text, e.g. `"42s"`.
    pub fn display(&self) -> String {
        format!("{}s", self.seconds_left())
    }

    /// Count down by `dt` if running.
    pub fn advance(&mut self, dt: f32) -> TimerTick {
        if self.status != TimerStatus::Running {
            return TimerTick::Idle;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.status = TimerStatus::Expired;
            log::info!("timer expired");
            return TimerTick::Expired;
        }
        TimerTick::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_down_and_expires_once() {
        let mut timer = CountdownTimer::new();
        timer.start(1.0);

        for _ in 0..3 {
            assert_eq!(timer.advance(0.25), TimerTick::Idle);
        }
        assert_eq!(timer.seconds_left(), 0);
        assert_eq!(timer.advance(0.5), TimerTick::Expired);
        assert_eq!(timer.remaining(), 0.0);
        assert_eq!(timer.status(), TimerStatus::Expired);
        assert_eq!(timer.advance(0.5), TimerTick::Idle);
    }

    #[test]
    fn test_pause_freezes_time() {
        let mut timer = CountdownTimer::new();
        timer.start(10.0);
        timer.advance(1.0);

        assert!(timer.toggle_pause());
        for _ in 0..100 {
            timer.advance(1.0);
        }
        assert_eq!(timer.remaining(), 9.0);

        assert!(!timer.toggle_pause());
        timer.advance(1.0);
        assert_eq!(timer.remaining(), 8.0);
        assert_eq!(timer.display(), "8s");
    }

    #[test]
    fn test_stopped_timer_never_expires() {
        let mut timer = CountdownTimer::new();
        assert_eq!(timer.advance(100.0), TimerTick::Idle);

        timer.start(1.0);
        timer.stop();
        assert_eq!(timer.advance(100.0), TimerTick::Idle);
        assert!(!timer.toggle_pause());
    }
}
