//! Circuit breaker state machine for upstream calls.
//!
//! Stops calling the upstream after N consecutive failed calls. Once the open
//! window has elapsed the next tick moves the breaker to half-open and lets
//! exactly one probe through; the probe's outcome closes or reopens it.
//!
//! The breaker is owned by the scheduler and only mutated inside a tick, so
//! it holds plain fields rather than atomics.

use std::time::{Duration, Instant};

use strum_macros::EnumIter as EnumIterMacro;

/// The three breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum BreakerState {
    /// Calls flow normally
    Closed,
    /// Calls are short-circuited until the open window elapses
    Open,
    /// One probe call decides whether to close or reopen
    HalfOpen,
}

impl BreakerState {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }

    /// Numeric value exported by the state gauge.
    pub fn gauge_value(&self) -> u8 {
        match self {
            BreakerState::Closed => 0,
            BreakerState::Open => 1,
            BreakerState::HalfOpen => 2,
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change of breaker state, reported to the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum BreakerTransition {
    /// Closed or half-open to open
    Opened,
    /// Open to half-open
    HalfOpened,
    /// Half-open to closed
    Closed,
}

impl BreakerTransition {
    /// State the breaker is in after this transition.
    pub fn target(&self) -> BreakerState {
        match self {
            BreakerTransition::Opened => BreakerState::Open,
            BreakerTransition::HalfOpened => BreakerState::HalfOpen,
            BreakerTransition::Closed => BreakerState::Closed,
        }
    }
}

/// Decision of the breaker gate for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Closed: call the upstream.
    Allow,
    /// Half-open: this call is the single probe.
    Probe,
    /// Open and still inside the window: do not call.
    ShortCircuit {
        /// Time left before a probe is allowed
        remaining: Duration,
    },
    /// Half-open with the probe already taken: do not call.
    ProbeBlocked,
}

impl Admission {
    /// Whether the upstream may be called.
    pub fn permits_call(&self) -> bool {
        matches!(self, Admission::Allow | Admission::Probe)
    }
}

/// Circuit breaker tracking upstream health.
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Number of consecutive failures before opening circuit
    failure_threshold: u32,
    /// How long the circuit stays open before a probe
    open_window: Duration,
    state: BreakerState,
    consecutive_failures: u32,
    /// Set when the circuit opens, cleared when it closes
    opened_at: Option<Instant>,
    probe_allowed: bool,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    ///
    /// # Arguments
    ///
    /// * `failure_threshold` - Consecutive failures that open the circuit
    /// * `open_window` - How long the circuit stays open before allowing a probe
    pub fn new(failure_threshold: u32, open_window: Duration) -> Self {
        CircuitBreaker {
            failure_threshold,
            open_window,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_allowed: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Gates one upstream call.
    ///
    /// An open breaker whose window has elapsed moves to half-open here and
    /// hands out its probe in the same call. Returns the decision plus the
    /// transition taken, if any.
    pub fn admit(&mut self, now: Instant) -> (Admission, Option<BreakerTransition>) {
        match self.state {
            BreakerState::Closed => (Admission::Allow, None),
            BreakerState::Open => {
                let elapsed = self
                    .opened_at
                    .map_or(self.open_window, |opened| now.saturating_duration_since(opened));
                if elapsed < self.open_window {
                    return (
                        Admission::ShortCircuit {
                            remaining: self.open_window - elapsed,
                        },
                        None,
                    );
                }
                self.state = BreakerState::HalfOpen;
                self.probe_allowed = true;
                log::warn!(
                    "Circuit breaker half-open after {}ms, allowing one probe",
                    elapsed.as_millis()
                );
                (self.take_probe(), Some(BreakerTransition::HalfOpened))
            }
            BreakerState::HalfOpen => (self.take_probe(), None),
        }
    }

    fn take_probe(&mut self) -> Admission {
        if std::mem::take(&mut self.probe_allowed) {
            Admission::Probe
        } else {
            Admission::ProbeBlocked
        }
    }

    /// Records a clean upstream success.
    ///
    /// Closes the circuit if this was the half-open probe; otherwise resets the
    /// failure count.
    pub fn record_success(&mut self) -> Option<BreakerTransition> {
        self.consecutive_failures = 0;
        if self.state == BreakerState::HalfOpen {
            self.state = BreakerState::Closed;
            self.opened_at = None;
            self.probe_allowed = false;
            log::warn!("Circuit breaker closed after successful probe");
            return Some(BreakerTransition::Closed);
        }
        None
    }

    /// Records a failed upstream call.
    ///
    /// A failed probe reopens the circuit with a fresh window; in the closed
    /// state the circuit opens once the threshold is reached.
    pub fn record_failure(&mut self, now: Instant) -> Option<BreakerTransition> {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        match self.state {
            BreakerState::HalfOpen => {
                self.open(now);
                log::warn!(
                    "Circuit breaker reopened after failed probe (window: {}ms)",
                    self.open_window.as_millis()
                );
                Some(BreakerTransition::Opened)
            }
            BreakerState::Closed if self.consecutive_failures >= self.failure_threshold => {
                self.open(now);
                log::warn!(
                    "Circuit breaker opened after {} consecutive failures (window: {}ms)",
                    self.consecutive_failures,
                    self.open_window.as_millis()
                );
                Some(BreakerTransition::Opened)
            }
            _ => None,
        }
    }

    fn open(&mut self, now: Instant) {
        self.state = BreakerState::Open;
        self.opened_at = Some(now);
        self.probe_allowed = false;
    }
}
