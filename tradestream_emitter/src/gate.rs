//! The mutable backpressure policy shared between the emitter and the scheduler

use std::time::Duration;

use parking_lot::Mutex;

/// The `(max_outstanding, delay)` pair that limits submission rate
///
/// The emitter holds off dispatching while the sink reports `max_outstanding` or
/// more unresolved submissions, sleeping `delay` between re-polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    /// Dispatch is suspended while the sink's outstanding count is at or above this
    pub max_outstanding: usize,
    /// How long to sleep before re-polling the sink while suspended
    pub delay: Duration,
}

/// Error returned for a gate policy that could never admit a submission
#[derive(Debug, thiserror::Error)]
#[error("backpressure max_outstanding must be greater than zero")]
pub struct InvalidGatePolicy;

/// Holds the current [`GatePolicy`] with concurrency-safe read/write
///
/// The pair is only ever observed as a matched set: a reader never sees the
/// `max_outstanding` of one policy combined with the `delay` of another. The
/// scheduler is the single writer; the emitter is the single reader.
#[derive(Debug)]
pub struct BackpressureGate {
    policy: Mutex<GatePolicy>,
}

impl BackpressureGate {
    /// Create a gate with an initial policy
    ///
    /// Rejects a non-positive `max_outstanding`, which would suspend dispatch
    /// forever. This is a startup-time configuration error, not something the
    /// running system recovers from.
    pub fn new(policy: GatePolicy) -> Result<Self, InvalidGatePolicy> {
        if policy.max_outstanding == 0 {
            return Err(InvalidGatePolicy);
        }
        Ok(Self {
            policy: Mutex::new(policy),
        })
    }

    /// Read the current policy as a matched pair
    pub fn get(&self) -> GatePolicy {
        *self.policy.lock()
    }

    /// Replace both fields atomically with respect to readers
    pub fn set(&self, policy: GatePolicy) {
        *self.policy.lock() = policy;
    }
}
