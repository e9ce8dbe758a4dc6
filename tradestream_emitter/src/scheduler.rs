//! Periodic retuning of the backpressure gate

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::gate::{BackpressureGate, GatePolicy};

/// Which retuning policy the scheduler applies, fixed for the process lifetime
///
/// The cycling modes alternate between a wide-open gate and a throttled one; the
/// fast variant uses shorter re-poll delays on both sides of the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThroughputMode {
    /// Operator-supplied gate policy; the scheduler leaves the gate untouched
    Manual,
    /// Alternate `(300000, 100ms)` and `(20000, 1000ms)`
    SlowCycle,
    /// Alternate `(300000, 10ms)` and `(20000, 100ms)`
    FastCycle,
}

impl FromStr for ThroughputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" | "manual" => Ok(Self::Manual),
            "1" | "slow-cycle" => Ok(Self::SlowCycle),
            "2" | "fast-cycle" => Ok(Self::FastCycle),
            other => Err(anyhow::anyhow!(
                "invalid throughput mode '{other}', expected one of: \
                 manual (0), slow-cycle (1), fast-cycle (2)"
            )),
        }
    }
}

impl std::fmt::Display for ThroughputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::SlowCycle => write!(f, "slow-cycle"),
            Self::FastCycle => write!(f, "fast-cycle"),
        }
    }
}

/// Where the cycling modes are in their two-state alternation
///
/// `Open` applies the wide gate on the next tick, `Throttled` the narrow one.
/// The cycle is deterministic and has no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Open,
    Throttled,
}

/// Periodically rewrites the gate policy according to the [`ThroughputMode`]
///
/// Single writer to the gate. A missed tick simply delays the next retune; ticks
/// are never compounded to catch up.
#[derive(Debug)]
pub struct ThroughputScheduler {
    gate: Arc<BackpressureGate>,
    mode: ThroughputMode,
    phase: Phase,
}

impl ThroughputScheduler {
    pub fn new(gate: Arc<BackpressureGate>, mode: ThroughputMode) -> Self {
        Self {
            gate,
            mode,
            phase: Phase::Open,
        }
    }

    /// The policy the next tick would apply, if any
    fn preset(&self) -> Option<GatePolicy> {
        let (max_outstanding, delay_millis) = match (self.mode, self.phase) {
            (ThroughputMode::Manual, _) => return None,
            (ThroughputMode::SlowCycle, Phase::Open) => (300_000, 100),
            (ThroughputMode::SlowCycle, Phase::Throttled) => (20_000, 1000),
            (ThroughputMode::FastCycle, Phase::Open) => (300_000, 10),
            (ThroughputMode::FastCycle, Phase::Throttled) => (20_000, 100),
        };
        Some(GatePolicy {
            max_outstanding,
            delay: Duration::from_millis(delay_millis),
        })
    }

    /// Apply one retune step
    ///
    /// In manual mode this is a no-op and the operator-set policy persists.
    pub fn tick(&mut self) {
        let Some(policy) = self.preset() else {
            return;
        };
        self.gate.set(policy);
        self.phase = match self.phase {
            Phase::Open => Phase::Throttled,
            Phase::Throttled => Phase::Open,
        };
        info!(
            max_outstanding = policy.max_outstanding,
            delay_millis = policy.delay.as_millis() as u64,
            "retuned backpressure gate"
        );
    }

    /// Drive [`tick`](Self::tick) on a fixed period until shutdown
    ///
    /// The first tick fires immediately, so the cycling modes overwrite the
    /// startup policy right away.
    pub async fn run(mut self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.tick(),
            }
        }
    }
}
