//! End-to-end tests of the emission control loop against a scripted in-memory sink

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use tradestream_emitter::{
    BackpressureGate, CompletionTracker, Emitter, EmitterError, EmitterStats, Event, EventSource,
    GatePolicy, Outcome, OutcomeHandle, RecordSink, SinkError, SourceError, Submission,
};

/// A sink whose `outstanding` counts are scripted and whose outcomes resolve
/// immediately
#[derive(Debug, Default)]
struct ScriptedSink {
    outstanding_script: Mutex<VecDeque<usize>>,
    /// Returned once the script is exhausted
    idle_outstanding: usize,
    /// Resolve every submission as a failure with this code/message
    fail_with: Option<(String, String)>,
    submissions: Mutex<Vec<(u64, Instant)>>,
}

impl ScriptedSink {
    fn with_outstanding(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            outstanding_script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        }
    }

    fn submitted_sequences(&self) -> Vec<u64> {
        self.submissions.lock().iter().map(|(s, _)| *s).collect()
    }
}

impl RecordSink for ScriptedSink {
    fn submit(&self, submission: Submission) -> Result<OutcomeHandle, SinkError> {
        self.submissions
            .lock()
            .push((submission.sequence, Instant::now()));
        let outcome = match &self.fail_with {
            Some((code, message)) => Outcome::Failure {
                error_code: code.clone(),
                error_message: message.clone(),
                attempts: 3,
            },
            None => Outcome::Success {
                sequence_number: format!("4959863019{}", submission.sequence),
                shard_id: "shardId-000000000000".to_string(),
                attempts: 1,
            },
        };
        let (tx, rx) = oneshot::channel();
        tx.send(outcome).expect("receiver not yet dropped");
        Ok(rx)
    }

    fn outstanding(&self) -> usize {
        self.outstanding_script
            .lock()
            .pop_front()
            .unwrap_or(self.idle_outstanding)
    }
}

/// Produces a fixed JSON payload and cancels the shutdown token once `limit`
/// events have been handed out
#[derive(Debug)]
struct CountedSource {
    produced: usize,
    limit: usize,
    shutdown: CancellationToken,
}

impl CountedSource {
    fn new(limit: usize, shutdown: CancellationToken) -> Self {
        Self {
            produced: 0,
            limit,
            shutdown,
        }
    }
}

impl EventSource for CountedSource {
    fn next_event(&mut self) -> Result<Event, SourceError> {
        self.produced += 1;
        if self.produced >= self.limit {
            self.shutdown.cancel();
        }
        Ok(Event {
            payload: Bytes::from_static(br#"{"tickerSymbol":"AAPL","price":119.72}"#),
            partition_key: "113427455640312821154458202477256070485".to_string(),
        })
    }
}

/// Fails after handing out `ok_events` events
#[derive(Debug)]
struct DisconnectingSource {
    ok_events: usize,
}

impl EventSource for DisconnectingSource {
    fn next_event(&mut self) -> Result<Event, SourceError> {
        if self.ok_events == 0 {
            return Err(SourceError::new("trade feed disconnected"));
        }
        self.ok_events -= 1;
        Ok(Event {
            payload: Bytes::from_static(br#"{"tickerSymbol":"XOM","price":91.56}"#),
            partition_key: "42".to_string(),
        })
    }
}

struct Fixture {
    sink: Arc<ScriptedSink>,
    gate: Arc<BackpressureGate>,
    stats: Arc<EmitterStats>,
    tracker: Arc<CompletionTracker>,
    shutdown: CancellationToken,
}

impl Fixture {
    fn new(sink: ScriptedSink, policy: GatePolicy) -> Self {
        let stats = Arc::new(EmitterStats::new());
        Self {
            sink: Arc::new(sink),
            gate: Arc::new(BackpressureGate::new(policy).unwrap()),
            tracker: Arc::new(CompletionTracker::new(Arc::clone(&stats))),
            stats,
            shutdown: CancellationToken::new(),
        }
    }

    fn emitter<S: EventSource>(&self, source: S) -> Emitter<S> {
        Emitter::new(
            source,
            Arc::clone(&self.sink) as Arc<dyn RecordSink>,
            Arc::clone(&self.gate),
            Arc::clone(&self.stats),
            Arc::clone(&self.tracker),
            "trades",
        )
        .with_shutdown(self.shutdown.clone())
    }
}

fn manual_policy(max_outstanding: usize, delay_millis: u64) -> GatePolicy {
    GatePolicy {
        max_outstanding,
        delay: Duration::from_millis(delay_millis),
    }
}

/// Let the spawned outcome tasks run to completion
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[test_log::test(tokio::test(start_paused = true))]
async fn blocked_polls_are_spaced_by_the_gate_delay() {
    // the sink reports 6 outstanding for two polls, then 4: with a threshold of
    // 5 and a 50ms delay the emitter must sleep exactly twice before dispatching
    let mut sink = ScriptedSink::with_outstanding([6, 6, 4]);
    sink.idle_outstanding = 6;
    let fx = Fixture::new(sink, manual_policy(5, 50));
    // the second event finds the gate closed again and is abandoned on shutdown
    let source = CountedSource::new(2, fx.shutdown.clone());

    let start = Instant::now();
    fx.emitter(source)
        .with_drain_timeout(Duration::from_millis(100))
        .run()
        .await
        .unwrap();

    let submissions = fx.sink.submissions.lock();
    assert_eq!(submissions.len(), 1);
    let (sequence, dispatched_at) = submissions[0];
    assert_eq!(sequence, 1);
    assert_eq!(
        dispatched_at.duration_since(start),
        Duration::from_millis(100)
    );
}

#[test_log::test(tokio::test(start_paused = true))]
async fn every_dispatched_submission_is_counted_exactly_once() {
    let fx = Fixture::new(ScriptedSink::default(), manual_policy(5, 50));
    let source = CountedSource::new(5, fx.shutdown.clone());

    fx.emitter(source).run().await.unwrap();
    settle().await;

    assert_eq!(fx.sink.submitted_sequences(), vec![1, 2, 3, 4, 5]);
    assert_eq!(fx.stats.submitted(), 5);
    assert_eq!(fx.stats.completed(), 5);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn per_record_failures_do_not_stop_the_loop() {
    let mut sink = ScriptedSink::default();
    sink.fail_with = Some((
        "ProvisionedThroughputExceededException".to_string(),
        "Rate exceeded for shard shardId-000000000000".to_string(),
    ));
    let fx = Fixture::new(sink, manual_policy(5, 50));
    let source = CountedSource::new(3, fx.shutdown.clone());

    fx.emitter(source).run().await.unwrap();
    settle().await;

    // failures are completions, just unsuccessful ones
    assert_eq!(fx.stats.submitted(), 3);
    assert_eq!(fx.stats.completed(), 3);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn source_failure_is_fatal_and_stops_submissions() {
    let fx = Fixture::new(ScriptedSink::default(), manual_policy(5, 50));
    let source = DisconnectingSource { ok_events: 2 };

    let err = fx.emitter(source).run().await.unwrap_err();
    assert!(matches!(err, EmitterError::Source(_)));

    // the sequence counter ticked for the failed attempt, but nothing was
    // dispatched for it
    assert_eq!(fx.stats.submitted(), 3);
    assert_eq!(fx.sink.submitted_sequences(), vec![1, 2]);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn completed_never_exceeds_submitted() {
    let fx = Fixture::new(ScriptedSink::default(), manual_policy(5, 50));
    let source = CountedSource::new(10, fx.shutdown.clone());

    fx.emitter(source).run().await.unwrap();
    settle().await;

    assert!(fx.stats.completed() <= fx.stats.submitted());
    assert_eq!(fx.stats.completed(), 10);
}

#[test_log::test(tokio::test(start_paused = true))]
async fn shutdown_while_gated_abandons_the_event_and_drains() {
    // outstanding never drops below the threshold, so the emitter stays gated
    // until the shutdown token fires; the drain then gives up after its bounded
    // timeout since the sink never resolves anything
    let mut sink = ScriptedSink::default();
    sink.idle_outstanding = 6;
    let fx = Fixture::new(sink, manual_policy(5, 50));
    let shutdown = fx.shutdown.clone();

    // a source that never triggers shutdown itself
    let source = CountedSource::new(usize::MAX, fx.shutdown.clone());
    let emitter = fx.emitter(source).with_drain_timeout(Duration::from_secs(1));

    let handle = tokio::spawn(emitter.run());
    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown.cancel();
    handle.await.unwrap().unwrap();

    // one sequence was assigned but never dispatched
    assert_eq!(fx.stats.submitted(), 1);
    assert!(fx.sink.submitted_sequences().is_empty());
}

#[test_log::test(tokio::test(start_paused = true))]
async fn drain_waits_for_outstanding_to_resolve() {
    // first poll admits the submission, then the drain observes 3, 2, 1, 0
    let fx = Fixture::new(
        ScriptedSink::with_outstanding([0, 3, 2, 1]),
        manual_policy(5, 50),
    );
    let source = CountedSource::new(1, fx.shutdown.clone());

    let start = Instant::now();
    fx.emitter(source).run().await.unwrap();

    // three 10ms drain polls before the count hit zero
    assert_eq!(start.elapsed(), Duration::from_millis(30));
}
