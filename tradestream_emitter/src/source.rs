//! The seam between the emission loop and whatever produces events

use bytes::Bytes;

/// One event ready to be wrapped in a submission
#[derive(Debug, Clone)]
pub struct Event {
    /// The serialized record
    pub payload: Bytes,
    /// Routing hint for the sink's shard partitioning
    pub partition_key: String,
}

/// Error producing the next event
///
/// The emitter treats any source error as fatal; there is no per-event recovery.
#[derive(Debug, thiserror::Error)]
#[error("event source failed: {message}")]
pub struct SourceError {
    message: String,
}

impl SourceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Produces the payloads the emitter submits
///
/// Sources have no dependency on the rest of the loop and are driven one event at
/// a time from the emitter's single control context.
pub trait EventSource: std::fmt::Debug + Send {
    fn next_event(&mut self) -> Result<Event, SourceError>;
}
