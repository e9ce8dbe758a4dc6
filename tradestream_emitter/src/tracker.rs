//! Exactly-once accounting of asynchronous submission outcomes

use std::sync::Arc;

use tracing::{info, warn};

use crate::sink::Outcome;
use crate::stats::EmitterStats;

/// Accounts for every asynchronous [`Outcome`] exactly once
///
/// Failures are completions too, just unsuccessful ones; there is no separate
/// error counter that would double-count against the completion count. Safe to
/// invoke concurrently from any number of outcome-delivery tasks, in any order --
/// the sink may resolve submissions out of order.
#[derive(Debug)]
pub struct CompletionTracker {
    stats: Arc<EmitterStats>,
}

impl CompletionTracker {
    pub fn new(stats: Arc<EmitterStats>) -> Self {
        Self { stats }
    }

    /// Record the outcome of the submission with the given logical sequence number
    pub fn record(&self, sequence: u64, outcome: Outcome) {
        self.stats.record_completed();
        match outcome {
            Outcome::Success {
                sequence_number,
                shard_id,
                attempts,
            } => {
                info!(
                    sequence,
                    sequence_number, shard_id, attempts, "record stored"
                );
            }
            Outcome::Failure {
                error_code,
                error_message,
                attempts,
            } => {
                warn!(
                    sequence,
                    error_code, error_message, attempts, "record failed to store"
                );
            }
        }
    }

    /// Record a submission whose outcome channel closed without resolving
    ///
    /// A well-behaved sink resolves every handle, but a submission must never be
    /// left permanently uncounted, so a dropped channel is accounted as a failed
    /// completion.
    pub fn record_lost(&self, sequence: u64) {
        self.record(
            sequence,
            Outcome::Failure {
                error_code: "OutcomeChannelClosed".to_string(),
                error_message: "sink dropped the outcome channel without resolving it".to_string(),
                attempts: 0,
            },
        );
    }
}
