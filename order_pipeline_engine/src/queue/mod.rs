//! # Queue contract
//!
//! The pipeline talks to its message queue exclusively through the [`QueueClient`] trait. The contract follows the
//! semantics of a visibility-timeout queue:
//!
//! * `receive` long-polls for up to `wait_time` and returns zero or more [`Envelope`]s. An empty result means "no work
//!   ready", never an error.
//! * A received envelope stays invisible to other receivers until its visibility timeout expires. If it has not been
//!   deleted by then, it is delivered again. This is the only retry mechanism in the pipeline.
//! * `delete` acknowledges an envelope using its receipt token. Deleting with a stale token is an error that callers
//!   log and move past.
//! * `send_batch` reports an outcome for every entry. Partial failure is normal.
//!
//! Two backends are provided: [`SqsQueue`] (feature `sqs`) and the in-process [`MemoryQueue`].
use std::{collections::HashMap, time::Duration};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::db_types::DEFAULT_MESSAGE_TYPE;

mod memory;
mod producer;
#[cfg(feature = "sqs")]
mod sqs;

pub use memory::MemoryQueue;
pub use producer::OrderProducer;
#[cfg(feature = "sqs")]
pub use sqs::{SqsConfig, SqsQueue};

/// The largest number of entries a single `send_batch` call accepts.
pub const MAX_BATCH_SIZE: usize = 10;
pub const MESSAGE_TYPE_ATTRIBUTE: &str = "MessageType";
pub const SENT_TIMESTAMP_ATTRIBUTE: &str = "SentTimestamp";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Queue transport error. {0}")]
    Transport(String),
    #[error("A batch may contain at most {max} entries, but {0} were supplied", max = MAX_BATCH_SIZE)]
    BatchTooLarge(usize),
    #[error("A batch must contain at least one entry")]
    EmptyBatch,
    #[error("The receipt token {0} does not match any in-flight message")]
    ReceiptNotFound(String),
    #[error("Invalid queue message. {0}")]
    InvalidMessage(String),
}

/// Rejects batches the queue would refuse, before any I/O takes place.
pub fn check_batch_size(len: usize) -> Result<(), QueueError> {
    match len {
        0 => Err(QueueError::EmptyBatch),
        n if n > MAX_BATCH_SIZE => Err(QueueError::BatchTooLarge(n)),
        _ => Ok(()),
    }
}

/// A typed, application-defined message attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageAttribute {
    pub data_type: String,
    #[serde(default)]
    pub string_value: Option<String>,
}

impl MessageAttribute {
    pub fn string<S: Into<String>>(value: S) -> Self {
        Self { data_type: "String".into(), string_value: Some(value.into()) }
    }

    pub fn number<N: ToString>(value: N) -> Self {
        Self { data_type: "Number".into(), string_value: Some(value.to_string()) }
    }
}

/// One unit of queue delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub message_id: String,
    /// The raw body. Producers in this system send JSON, but nothing guarantees it.
    pub body: String,
    /// Opaque token used to delete this particular delivery.
    pub receipt_token: String,
    /// System attributes, e.g. `SentTimestamp` (epoch millis as a string).
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_attributes: HashMap<String, MessageAttribute>,
}

impl Envelope {
    /// The `MessageType` message attribute, or `TASK_MESSAGE` when it is absent.
    pub fn message_type(&self) -> &str {
        self.message_attributes
            .get(MESSAGE_TYPE_ATTRIBUTE)
            .and_then(|a| a.string_value.as_deref())
            .unwrap_or(DEFAULT_MESSAGE_TYPE)
    }

    pub fn sent_timestamp(&self) -> Option<DateTime<Utc>> {
        self.attributes
            .get(SENT_TIMESTAMP_ATTRIBUTE)
            .and_then(|ts| ts.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
    }

    /// A delivery can only be deleted with its receipt token.
    pub fn can_be_acknowledged(&self) -> bool {
        !self.receipt_token.is_empty()
    }

    /// The complete envelope, metadata and unparsed body, as a JSON document for the raw audit trail.
    pub fn to_raw_json(&self) -> Value {
        json!({
            "messageId": self.message_id,
            "body": self.body,
            "receiptToken": self.receipt_token,
            "attributes": self.attributes,
            "messageAttributes": self.message_attributes,
        })
    }
}

/// A message waiting to be sent as part of a batch. `id` only needs to be unique within its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub id: String,
    pub body: String,
    pub attributes: HashMap<String, MessageAttribute>,
}

impl BatchEntry {
    pub fn new<S: Into<String>>(id: S, body: String) -> Self {
        Self { id: id.into(), body, attributes: HashMap::new() }
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, MessageAttribute>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// The outcome of a single batch entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BatchEntryResult {
    Sent {
        id: String,
        #[serde(rename = "messageId")]
        message_id: String,
    },
    Failed {
        id: String,
        error: String,
    },
}

impl BatchEntryResult {
    pub fn id(&self) -> &str {
        match self {
            BatchEntryResult::Sent { id, .. } | BatchEntryResult::Failed { id, .. } => id.as_str(),
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self, BatchEntryResult::Sent { .. })
    }
}

#[allow(async_fn_in_trait)]
pub trait QueueClient {
    /// Waits up to `wait_time` for messages and returns at most `max_messages` of them.
    async fn receive(&self, max_messages: usize, wait_time: Duration) -> Result<Vec<Envelope>, QueueError>;

    /// Acknowledges a delivery. The message will not be delivered again.
    async fn delete(&self, receipt_token: &str) -> Result<(), QueueError>;

    /// Sends a single message and returns the id the queue assigned to it.
    async fn send(&self, body: String, attributes: HashMap<String, MessageAttribute>) -> Result<String, QueueError>;

    /// Sends up to [`MAX_BATCH_SIZE`] messages. The result carries one outcome per entry, in input order.
    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchEntryResult>, QueueError>;
}
