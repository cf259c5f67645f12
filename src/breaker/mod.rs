//! Upstream circuit breaker.

mod state;

pub use state::{Admission, BreakerState, BreakerTransition, CircuitBreaker};
