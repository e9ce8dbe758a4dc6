//! Periodic progress status line

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::stats::EmitterStats;

/// Emits a periodic submitted/completed status line
///
/// Observability only: reads the counters without synchronizing across the two
/// reads (a momentarily stale pair is fine), mutates nothing, and cannot stop the
/// emission loop.
#[derive(Debug)]
pub struct ProgressReporter {
    stats: Arc<EmitterStats>,
}

impl ProgressReporter {
    pub fn new(stats: Arc<EmitterStats>) -> Self {
        Self { stats }
    }

    /// Log one status line
    pub fn report(&self) {
        let submitted = self.stats.submitted();
        let completed = self.stats.completed();
        info!(submitted, completed, "emission progress");
    }

    /// Drive [`report`](Self::report) on a fixed period until shutdown
    pub async fn run(self, period: Duration, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => self.report(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn stops_on_cancellation() {
        let stats = Arc::new(EmitterStats::new());
        let shutdown = CancellationToken::new();
        let reporter = ProgressReporter::new(Arc::clone(&stats));

        let handle = tokio::spawn(reporter.run(Duration::from_secs(1), shutdown.clone()));
        tokio::time::sleep(Duration::from_secs(3)).await;
        shutdown.cancel();
        handle.await.unwrap();
    }
}
