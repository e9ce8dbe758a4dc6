//! The seam between the emission loop and the ingestion sink

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One unit handed to the sink
///
/// Immutable once created; owned solely by the emitter until dispatch.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The target stream identifier
    pub stream_id: Arc<str>,
    /// Routing hint for the sink's shard partitioning
    pub partition_key: String,
    /// The serialized record
    pub payload: Bytes,
    /// Logical sequence number assigned at submission time
    pub sequence: u64,
}

/// Terminal result of a [`Submission`], produced exactly once by the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success {
        /// The sink-assigned sequence number of the stored record
        sequence_number: String,
        /// The shard the record was routed to
        shard_id: String,
        /// How many attempts the sink made before the record was stored
        attempts: usize,
    },
    Failure {
        /// Error code of the last attempt
        error_code: String,
        /// Error message of the last attempt
        error_message: String,
        /// How many attempts the sink made before giving up
        attempts: usize,
    },
}

/// Resolves to the [`Outcome`] of a dispatched submission
pub type OutcomeHandle = oneshot::Receiver<Outcome>;

/// Error dispatching a submission to the sink
///
/// This covers the act of dispatching itself failing, which the emitter treats as
/// fatal. Per-record failures are reported asynchronously as [`Outcome::Failure`]
/// and are not represented here.
#[derive(Debug, thiserror::Error)]
#[error("failed to dispatch submission to sink: {message}")]
pub struct SinkError {
    message: String,
}

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A shard-partitioned ingestion sink
///
/// Implementations accept submissions without blocking the caller and resolve each
/// one asynchronously on their own concurrent context. The sink keeps its own
/// count of accepted-but-unresolved submissions, which is the quantity the
/// backpressure gate compares against. Note that this is the sink's accounting,
/// not the locally derived submitted/completed difference; the gate's
/// responsiveness follows the sink's freshness.
pub trait RecordSink: std::fmt::Debug + Send + Sync {
    /// Dispatch a submission, returning a handle that resolves to its [`Outcome`]
    ///
    /// Must not block. An error here means the dispatch itself failed and is fatal
    /// to the emission loop.
    fn submit(&self, submission: Submission) -> Result<OutcomeHandle, SinkError>;

    /// The sink's current count of submissions accepted but not yet resolved
    fn outstanding(&self) -> usize;
}
