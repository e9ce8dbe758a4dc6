//! Rate-governed emission of records into a shard-partitioned ingestion sink
//!
//! This crate provides the control loop that drives an unbounded sequence of record
//! submissions while protecting the sink (and the local process) from an unbounded
//! producer. The pieces fit together as follows:
//!
//! - The [`Emitter`] pulls events from an [`EventSource`], consults the
//!   [`BackpressureGate`], and dispatches submissions to a [`RecordSink`].
//! - The sink resolves each submission asynchronously to an [`Outcome`], which the
//!   [`CompletionTracker`] accounts for exactly once.
//! - The [`ThroughputScheduler`] periodically retunes the gate according to a fixed
//!   [`ThroughputMode`], and the [`ProgressReporter`] emits a periodic status line.
//!
//! Shared counters live in [`EmitterStats`], constructed once at startup and handed
//! to each component by reference. There are no hidden globals.
//!
//! Delivery to the sink is neither exactly-once nor ordered; unacknowledged
//! submissions do not survive a restart. This is a rate-governed emission loop, not
//! a durable queue.

pub mod emitter;
pub mod gate;
pub mod reporter;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod stats;
pub mod tracker;

pub use emitter::{Emitter, EmitterError};
pub use gate::{BackpressureGate, GatePolicy, InvalidGatePolicy};
pub use reporter::ProgressReporter;
pub use scheduler::{Phase, ThroughputMode, ThroughputScheduler};
pub use sink::{Outcome, OutcomeHandle, RecordSink, SinkError, Submission};
pub use source::{Event, EventSource, SourceError};
pub use stats::EmitterStats;
pub use tracker::CompletionTracker;
