//! Shared submission/completion counters

use std::sync::atomic::{AtomicU64, Ordering};

/// The counters shared between the emitter, the completion tracker, and the
/// progress reporter
///
/// `submitted` is incremented exactly once per submission attempt, before the
/// submission is dispatched; it is the source of each submission's logical
/// sequence number and only the emitter writes it. `completed` counts observed
/// outcomes (success and failure alike) and is incremented from arbitrary
/// outcome-delivery tasks.
///
/// `completed <= submitted` holds at all times, since completions only arise
/// from already-counted submissions.
#[derive(Debug, Default)]
pub struct EmitterStats {
    submitted: AtomicU64,
    completed: AtomicU64,
}

impl EmitterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one submission attempt, returning its logical sequence number
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Count one observed outcome
    pub fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_monotonic_from_one() {
        let stats = EmitterStats::new();
        assert_eq!(stats.record_submitted(), 1);
        assert_eq!(stats.record_submitted(), 2);
        assert_eq!(stats.record_submitted(), 3);
        assert_eq!(stats.submitted(), 3);
        assert_eq!(stats.completed(), 0);
    }

    #[test]
    fn completions_count_independently() {
        let stats = EmitterStats::new();
        stats.record_submitted();
        stats.record_submitted();
        stats.record_completed();
        assert_eq!(stats.submitted(), 2);
        assert_eq!(stats.completed(), 1);
    }
}
