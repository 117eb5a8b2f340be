use std::fmt::{Display, Formatter};

use futures_util::{stream, StreamExt};
use log::*;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::{
    consumer::{ConsumerConfig, MessageHandler},
    db_types::{NewMessageRecord, NewRawRecord, OrderId},
    queue::{Envelope, QueueClient, QueueError},
    traits::AuditManagement,
};

/// What happened to a single envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeOutcome {
    /// Handled, recorded as `PROCESSED` and deleted from the queue.
    Acknowledged,
    /// Handled, but either the `PROCESSED` record or the delete failed. The envelope will be redelivered.
    Unacknowledged,
    /// The handler failed. Recorded as `FAILED` and left on the queue.
    HandlerFailed,
    /// The body is not JSON, or the envelope has no receipt token. Recorded as `FAILED` and not handled.
    Malformed,
}

/// Running totals over the lifetime of a consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub polls: u64,
    pub empty_polls: u64,
    pub receive_errors: u64,
    pub received: u64,
    pub acknowledged: u64,
    pub unacknowledged: u64,
    pub handler_failures: u64,
    pub malformed: u64,
}

impl ConsumerStats {
    pub fn record(&mut self, outcome: EnvelopeOutcome) {
        self.received += 1;
        match outcome {
            EnvelopeOutcome::Acknowledged => self.acknowledged += 1,
            EnvelopeOutcome::Unacknowledged => self.unacknowledged += 1,
            EnvelopeOutcome::HandlerFailed => self.handler_failures += 1,
            EnvelopeOutcome::Malformed => self.malformed += 1,
        }
    }
}

impl Display for ConsumerStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} polls ({} empty, {} errors), {} messages: {} acknowledged, {} unacknowledged, {} handler failures, {} \
             malformed",
            self.polls,
            self.empty_polls,
            self.receive_errors,
            self.received,
            self.acknowledged,
            self.unacknowledged,
            self.handler_failures,
            self.malformed
        )
    }
}

/// The polling consumer. See the [module documentation](crate::consumer) for the per-envelope sequence.
pub struct QueueConsumer<Q, A, H> {
    queue: Q,
    audit: A,
    handler: H,
    config: ConsumerConfig,
}

impl<Q, A, H> QueueConsumer<Q, A, H>
where
    Q: QueueClient,
    A: AuditManagement,
    H: MessageHandler,
{
    pub fn new(queue: Q, audit: A, handler: H, config: ConsumerConfig) -> Self {
        Self { queue, audit, handler, config }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Polls until `shutdown` is cancelled and returns the totals.
    ///
    /// Cancellation interrupts a pending receive call or backoff pause, but never the processing of a batch.
    pub async fn run(&self, shutdown: CancellationToken) -> ConsumerStats {
        info!("🕰️ Queue consumer started");
        let mut stats = ConsumerStats::default();
        while !shutdown.is_cancelled() {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                r = self.queue.receive(self.config.max_messages, self.config.wait_time) => r,
            };
            stats.polls += 1;
            match received {
                Ok(envelopes) if envelopes.is_empty() => {
                    stats.empty_polls += 1;
                    trace!("🕰️ No new messages");
                },
                Ok(envelopes) => {
                    for outcome in self.dispatch(envelopes).await {
                        stats.record(outcome);
                    }
                },
                Err(e) => {
                    stats.receive_errors += 1;
                    error!("🕰️ Could not receive messages. Retrying in {:?}. {e}", self.config.error_backoff);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.error_backoff) => {},
                    }
                },
            }
        }
        info!("🕰️ Queue consumer stopped. {stats}");
        stats
    }

    /// A single receive-and-dispatch cycle.
    pub async fn poll_once(&self) -> Result<Vec<EnvelopeOutcome>, QueueError> {
        let envelopes = self.queue.receive(self.config.max_messages, self.config.wait_time).await?;
        Ok(self.dispatch(envelopes).await)
    }

    async fn dispatch(&self, envelopes: Vec<Envelope>) -> Vec<EnvelopeOutcome> {
        debug!("🕰️ Dispatching {} message(s)", envelopes.len());
        if self.config.concurrency <= 1 {
            let mut outcomes = Vec::with_capacity(envelopes.len());
            for envelope in &envelopes {
                outcomes.push(self.process_envelope(envelope).await);
            }
            outcomes
        } else {
            let pending = envelopes.iter().map(|envelope| self.process_envelope(envelope)).collect::<Vec<_>>();
            stream::iter(pending)
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await
        }
    }

    /// Runs one envelope through the full sequence. Never fails; the outcome says how far it got.
    pub async fn process_envelope(&self, envelope: &Envelope) -> EnvelopeOutcome {
        let message_id = envelope.message_id.as_str();
        trace!("🕰️ Processing message {message_id}");
        let raw = NewRawRecord::new(message_id, envelope.to_raw_json());
        if let Err(e) = self.audit.insert_raw_record(raw).await {
            error!("🕰️ Could not store the raw copy of message {message_id}. Processing continues. {e}");
        }
        if !envelope.can_be_acknowledged() {
            warn!("🕰️ Message {message_id} has no receipt token and cannot be acknowledged. It will not be handled.");
            let body =
                serde_json::from_str::<Value>(&envelope.body).unwrap_or_else(|_| Value::String(envelope.body.clone()));
            let record =
                NewMessageRecord::failed(message_id, body, envelope.message_type(), "Message has no receipt token".into());
            self.record_failure(record).await;
            return EnvelopeOutcome::Malformed;
        }
        let body = match serde_json::from_str::<Value>(&envelope.body) {
            Ok(body) => body,
            Err(e) => {
                warn!("🕰️ Message {message_id} has a malformed body. It will not be acknowledged. {e}");
                let record = NewMessageRecord::failed(
                    message_id,
                    Value::String(envelope.body.clone()),
                    envelope.message_type(),
                    format!("Malformed message body: {e}"),
                );
                self.record_failure(record).await;
                return EnvelopeOutcome::Malformed;
            },
        };
        match self.handler.handle(&body).await {
            Ok(receipt) => {
                let record = NewMessageRecord::processed(message_id, body, envelope.message_type())
                    .with_order_id(receipt.reference.map(OrderId::from));
                if let Err(e) = self.audit.insert_message_record(record).await {
                    error!(
                        "🕰️ Message {message_id} was handled, but its PROCESSED record could not be stored. It will \
                         not be acknowledged. {e}"
                    );
                    return EnvelopeOutcome::Unacknowledged;
                }
                match self.queue.delete(&envelope.receipt_token).await {
                    Ok(()) => {
                        debug!("🕰️ Message {message_id} processed and acknowledged");
                        EnvelopeOutcome::Acknowledged
                    },
                    Err(e) => {
                        warn!("🕰️ Message {message_id} could not be deleted and will be redelivered. {e}");
                        EnvelopeOutcome::Unacknowledged
                    },
                }
            },
            Err(e) => {
                warn!("🕰️ Message {message_id} failed. It stays on the queue for redelivery. {e}");
                let record = NewMessageRecord::failed(message_id, body, envelope.message_type(), e.message)
                    .with_order_id(e.reference.map(OrderId::from));
                self.record_failure(record).await;
                EnvelopeOutcome::HandlerFailed
            },
        }
    }

    async fn record_failure(&self, record: NewMessageRecord) {
        let message_id = record.message_id.clone();
        if let Err(e) = self.audit.insert_message_record(record).await {
            error!("🕰️ Could not store the FAILED record for message {message_id}. {e}");
        }
    }
}
