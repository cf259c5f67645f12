//! Two-level drain cadence.

use std::time::Duration;

/// The drain interval: either the base value or the penalized one.
#[derive(Debug, Clone)]
pub struct Cadence {
    base: Duration,
    penalized: Duration,
    current: Duration,
}

impl Cadence {
    /// Starts at `base`.
    pub fn new(base: Duration, penalized: Duration) -> Self {
        Cadence {
            base,
            penalized,
            current: base,
        }
    }

    /// Current interval.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Whether the penalized interval is in effect.
    pub fn is_penalized(&self) -> bool {
        self.current != self.base
    }

    /// Switches to the penalized interval. Returns it if the interval changed.
    pub fn penalize(&mut self) -> Option<Duration> {
        self.switch_to(self.penalized)
    }

    /// Switches back to the base interval. Returns it if the interval changed.
    pub fn restore(&mut self) -> Option<Duration> {
        self.switch_to(self.base)
    }

    fn switch_to(&mut self, interval: Duration) -> Option<Duration> {
        if self.current == interval {
            return None;
        }
        self.current = interval;
        Some(interval)
    }
}
