//! Amazon SQS backend for the [`QueueClient`] contract.
use std::{collections::HashMap, time::Duration};

use aws_config::{BehaviorVersion, Region};
use aws_sdk_sqs::{
    config::Credentials,
    error::DisplayErrorContext,
    types::{
        Message,
        MessageAttributeValue,
        MessageSystemAttributeName,
        QueueAttributeName,
        SendMessageBatchRequestEntry,
    },
    Client,
};
use log::*;
use opl_common::Secret;
use uuid::Uuid;

use crate::queue::{check_batch_size, BatchEntry, BatchEntryResult, Envelope, MessageAttribute, QueueClient, QueueError};

/// SQS does not accept long-poll waits above 20 seconds.
const MAX_WAIT_SECONDS: u64 = 20;

#[derive(Debug, Clone, Default)]
pub struct SqsConfig {
    pub queue_url: String,
    pub region: String,
    /// Overrides the service endpoint, e.g. for a local emulator.
    pub endpoint: Option<String>,
    /// Static credentials. When absent, the default AWS provider chain is used.
    pub access_key_id: Option<String>,
    pub secret_access_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    /// Builds an SQS client from explicit configuration.
    pub async fn connect(config: &SqsConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint {
            info!("📨️ Using SQS endpoint override {endpoint}");
            loader = loader.endpoint_url(endpoint);
        }
        match (&config.access_key_id, config.secret_access_key.is_empty()) {
            (Some(key_id), false) => {
                let credentials =
                    Credentials::new(key_id, config.secret_access_key.reveal(), None, None, "opl-environment");
                loader = loader.credentials_provider(credentials);
            },
            _ => debug!("📨️ No static AWS credentials configured. Using the default provider chain."),
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), config.queue_url.clone())
    }

    pub fn queue_url(&self) -> &str {
        self.queue_url.as_str()
    }

    /// Confirms that the queue exists and the credentials can read it. Returns the approximate number of waiting
    /// messages.
    pub async fn check_connection(&self) -> Result<u64, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
            .send()
            .await
            .map_err(transport_error)?;
        let waiting = output
            .attributes()
            .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
            .and_then(|n| n.parse::<u64>().ok())
            .unwrap_or_default();
        debug!("📨️ Queue {} is reachable with about {waiting} message(s) waiting", self.queue_url);
        Ok(waiting)
    }
}

fn transport_error<E: std::error::Error + 'static>(e: E) -> QueueError {
    QueueError::Transport(DisplayErrorContext(e).to_string())
}

fn to_sdk_attribute(attribute: MessageAttribute) -> Result<MessageAttributeValue, QueueError> {
    MessageAttributeValue::builder()
        .data_type(attribute.data_type)
        .set_string_value(attribute.string_value)
        .build()
        .map_err(|e| QueueError::InvalidMessage(e.to_string()))
}

fn to_sdk_attributes(
    attributes: HashMap<String, MessageAttribute>,
) -> Result<Option<HashMap<String, MessageAttributeValue>>, QueueError> {
    if attributes.is_empty() {
        return Ok(None);
    }
    let converted = attributes
        .into_iter()
        .map(|(name, value)| to_sdk_attribute(value).map(|v| (name, v)))
        .collect::<Result<HashMap<_, _>, _>>()?;
    Ok(Some(converted))
}

/// Converts an SQS message into an envelope. Messages missing their id or receipt handle are still passed on, so
/// that the consumer audits them. An envelope without a receipt token is never handled.
fn to_envelope(message: &Message) -> Envelope {
    let message_id = match message.message_id() {
        Some(id) => id.to_string(),
        None => {
            let id = format!("unidentified-{}", Uuid::new_v4());
            warn!("📨️ SQS returned a message without an id. It is tracked as {id}.");
            id
        },
    };
    let receipt_token = message.receipt_handle().map(String::from).unwrap_or_else(|| {
        warn!("📨️ Message {message_id} has no receipt handle and cannot be deleted");
        String::new()
    });
    let attributes = message
        .attributes()
        .map(|attrs| attrs.iter().map(|(k, v)| (k.as_str().to_string(), v.clone())).collect())
        .unwrap_or_default();
    let message_attributes = message
        .message_attributes()
        .map(|attrs| {
            attrs
                .iter()
                .map(|(k, v)| {
                    let attribute = MessageAttribute {
                        data_type: v.data_type().to_string(),
                        string_value: v.string_value().map(String::from),
                    };
                    (k.clone(), attribute)
                })
                .collect()
        })
        .unwrap_or_default();
    Envelope {
        message_id,
        body: message.body().unwrap_or_default().to_string(),
        receipt_token,
        attributes,
        message_attributes,
    }
}

impl QueueClient for SqsQueue {
    async fn receive(&self, max_messages: usize, wait_time: Duration) -> Result<Vec<Envelope>, QueueError> {
        let max_messages = max_messages.clamp(1, crate::queue::MAX_BATCH_SIZE) as i32;
        let wait_seconds = wait_time.as_secs().min(MAX_WAIT_SECONDS) as i32;
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .message_attribute_names("All")
            .message_system_attribute_names(MessageSystemAttributeName::All)
            .send()
            .await
            .map_err(transport_error)?;
        let envelopes = output.messages().iter().map(to_envelope).collect::<Vec<Envelope>>();
        trace!("📨️ Received {} message(s) from {}", envelopes.len(), self.queue_url);
        Ok(envelopes)
    }

    async fn delete(&self, receipt_token: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_token)
            .send()
            .await
            .map_err(transport_error)?;
        Ok(())
    }

    async fn send(&self, body: String, attributes: HashMap<String, MessageAttribute>) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .set_message_attributes(to_sdk_attributes(attributes)?)
            .send()
            .await
            .map_err(transport_error)?;
        let message_id = output
            .message_id()
            .map(String::from)
            .ok_or_else(|| QueueError::InvalidMessage("SQS did not return a message id".into()))?;
        debug!("📨️ Message {message_id} sent to {}", self.queue_url);
        Ok(message_id)
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchEntryResult>, QueueError> {
        check_batch_size(entries.len())?;
        let ids = entries.iter().map(|e| e.id.clone()).collect::<Vec<String>>();
        let request_entries = entries
            .into_iter()
            .map(|entry| {
                SendMessageBatchRequestEntry::builder()
                    .id(entry.id)
                    .message_body(entry.body)
                    .set_message_attributes(to_sdk_attributes(entry.attributes)?)
                    .build()
                    .map_err(|e| QueueError::InvalidMessage(e.to_string()))
            })
            .collect::<Result<Vec<_>, QueueError>>()?;
        let output = self
            .client
            .send_message_batch()
            .queue_url(&self.queue_url)
            .set_entries(Some(request_entries))
            .send()
            .await
            .map_err(transport_error)?;
        let mut sent =
            output.successful().iter().map(|s| (s.id().to_string(), s.message_id().to_string())).collect::<HashMap<_, _>>();
        let mut failed = output
            .failed()
            .iter()
            .map(|f| {
                let error = format!("{}: {}", f.code(), f.message().unwrap_or("no details"));
                (f.id().to_string(), error)
            })
            .collect::<HashMap<_, _>>();
        let results = ids
            .into_iter()
            .map(|id| match (sent.remove(&id), failed.remove(&id)) {
                (Some(message_id), _) => BatchEntryResult::Sent { id, message_id },
                (None, Some(error)) => BatchEntryResult::Failed { id, error },
                (None, None) => BatchEntryResult::Failed { id, error: "SQS reported no outcome for this entry".into() },
            })
            .collect::<Vec<_>>();
        let failures = results.iter().filter(|r| !r.is_sent()).count();
        if failures > 0 {
            warn!("📨️ {failures} of {} batch entries were not sent", results.len());
        }
        Ok(results)
    }
}
