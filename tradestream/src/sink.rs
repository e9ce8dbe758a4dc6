//! [`RecordSink`] adapter over the HTTP ingestion client

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::oneshot;

use tradestream_client::Client;
use tradestream_emitter::{Outcome, OutcomeHandle, RecordSink, SinkError, Submission};

/// Submits records over HTTP, one request per submission
///
/// `submit` never blocks: it spawns a task that performs the put_record request
/// and resolves the outcome handle. The outstanding count covers submissions
/// accepted here but not yet resolved, which is what the backpressure gate
/// polls.
#[derive(Debug)]
pub(crate) struct HttpRecordSink {
    client: Client,
    outstanding: Arc<AtomicUsize>,
}

impl HttpRecordSink {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RecordSink for HttpRecordSink {
    fn submit(&self, submission: Submission) -> Result<OutcomeHandle, SinkError> {
        let (tx, rx) = oneshot::channel();
        let client = self.client.clone();
        let outstanding = Arc::clone(&self.outstanding);
        outstanding.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let res = client
                .api_v1_put_record(submission.stream_id.as_ref())
                .partition_key(submission.partition_key)
                .body(submission.payload)
                .send()
                .await;
            outstanding.fetch_sub(1, Ordering::Relaxed);

            let outcome = match res {
                Ok(resp) => Outcome::Success {
                    sequence_number: resp.sequence_number,
                    shard_id: resp.shard_id,
                    attempts: 1,
                },
                Err(tradestream_client::Error::ApiError {
                    error_code,
                    message,
                    ..
                }) => Outcome::Failure {
                    error_code,
                    error_message: message,
                    attempts: 1,
                },
                Err(e) => Outcome::Failure {
                    error_code: "RequestError".to_string(),
                    error_message: e.to_string(),
                    attempts: 1,
                },
            };
            // the emitter may have been torn down mid-flight; nothing to do then
            let _ = tx.send(outcome);
        });

        Ok(rx)
    }

    fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Relaxed)
    }
}
