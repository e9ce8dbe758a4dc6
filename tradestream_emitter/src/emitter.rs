//! The emission control loop

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::gate::BackpressureGate;
use crate::sink::{RecordSink, SinkError, Submission};
use crate::source::{EventSource, SourceError};
use crate::stats::EmitterStats;
use crate::tracker::CompletionTracker;

/// How often the drain loop re-polls the sink after shutdown is signaled
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A fatal, loop-terminating error
///
/// Per-record sink failures are not represented here; those resolve
/// asynchronously and are isolated to the [`CompletionTracker`].
#[derive(Debug, thiserror::Error)]
pub enum EmitterError {
    #[error("event source failure: {0}")]
    Source(#[from] SourceError),

    #[error("sink dispatch failure: {0}")]
    Sink(#[from] SinkError),
}

/// Drives an unbounded sequence of submissions under the backpressure policy
///
/// Each iteration assigns a sequence number, pulls the next event from the
/// source, waits for gate capacity, and dispatches to the sink, wiring the
/// asynchronous outcome into the tracker. The loop runs until a fatal error or
/// until the shutdown token fires, in which case it stops submitting and drains
/// outstanding submissions with a bounded timeout.
///
/// Rather than terminating the process on a fatal error, [`run`](Self::run)
/// returns it and lets the owning process decide on exit behavior.
#[derive(Debug)]
pub struct Emitter<S> {
    source: S,
    sink: Arc<dyn RecordSink>,
    gate: Arc<BackpressureGate>,
    stats: Arc<EmitterStats>,
    tracker: Arc<CompletionTracker>,
    stream_id: Arc<str>,
    shutdown: CancellationToken,
    drain_timeout: Duration,
}

impl<S: EventSource> Emitter<S> {
    pub fn new(
        source: S,
        sink: Arc<dyn RecordSink>,
        gate: Arc<BackpressureGate>,
        stats: Arc<EmitterStats>,
        tracker: Arc<CompletionTracker>,
        stream_id: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            source,
            sink,
            gate,
            stats,
            tracker,
            stream_id: stream_id.into(),
            shutdown: CancellationToken::new(),
            drain_timeout: Duration::from_secs(10),
        }
    }

    /// Stop submitting and drain when this token fires
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Bound how long the post-shutdown drain waits for outstanding submissions
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    /// Run the control loop until a fatal error or shutdown
    pub async fn run(mut self) -> Result<(), EmitterError> {
        info!(stream_id = %self.stream_id, "starting emission loop");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let sequence = self.stats.record_submitted();
            let event = self.source.next_event()?;

            if !self.wait_for_capacity().await {
                // shutdown fired while gated; the current event is abandoned
                break;
            }

            let submission = Submission {
                stream_id: Arc::clone(&self.stream_id),
                partition_key: event.partition_key,
                payload: event.payload,
                sequence,
            };
            let handle = self.sink.submit(submission)?;

            let tracker = Arc::clone(&self.tracker);
            tokio::spawn(async move {
                match handle.await {
                    Ok(outcome) => tracker.record(sequence, outcome),
                    Err(_) => tracker.record_lost(sequence),
                }
            });
        }

        self.drain().await;
        Ok(())
    }

    /// Poll the sink until its outstanding count drops below the gate threshold
    ///
    /// A bounded busy-wait, not an event-driven wake-up: the sink is opaque and
    /// offers no notification when outstanding submissions resolve. The gate is
    /// re-read on every poll so a concurrent retune takes effect mid-wait.
    /// Returns `false` if shutdown fired while waiting.
    async fn wait_for_capacity(&self) -> bool {
        loop {
            let policy = self.gate.get();
            if self.sink.outstanding() < policy.max_outstanding {
                return true;
            }
            if self.shutdown.is_cancelled() {
                return false;
            }
            tokio::time::sleep(policy.delay).await;
        }
    }

    /// Wait for the sink to resolve its outstanding submissions, up to the
    /// drain timeout
    async fn drain(&self) {
        let deadline = Instant::now() + self.drain_timeout;
        loop {
            let outstanding = self.sink.outstanding();
            if outstanding == 0 {
                info!("emission loop drained");
                return;
            }
            if Instant::now() >= deadline {
                warn!(outstanding, "drain timeout elapsed with submissions still outstanding");
                return;
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
    }
}
