//! An in-process queue with visibility-timeout semantics.
//!
//! Messages that are received but not deleted become visible again once their visibility timeout expires, and are
//! then redelivered with a fresh receipt token. Receivers long-poll: a `receive` call with a non-zero wait returns
//! as soon as a message becomes available.
use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::Utc;
use log::*;
use tokio::{
    sync::{Mutex, Notify},
    time::Instant,
};
use uuid::Uuid;

use crate::queue::{
    check_batch_size,
    BatchEntry,
    BatchEntryResult,
    Envelope,
    MessageAttribute,
    QueueClient,
    QueueError,
    SENT_TIMESTAMP_ATTRIBUTE,
};

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug)]
struct StoredMessage {
    message_id: String,
    body: String,
    attributes: HashMap<String, String>,
    message_attributes: HashMap<String, MessageAttribute>,
    receive_count: u32,
    visible_at: Instant,
    receipt_token: Option<String>,
}

impl StoredMessage {
    fn deliver(&mut self, now: Instant, visibility_timeout: Duration) -> Envelope {
        let token = Uuid::new_v4().to_string();
        self.receive_count += 1;
        self.visible_at = now + visibility_timeout;
        self.receipt_token = Some(token.clone());
        let mut attributes = self.attributes.clone();
        attributes.insert("ApproximateReceiveCount".into(), self.receive_count.to_string());
        Envelope {
            message_id: self.message_id.clone(),
            body: self.body.clone(),
            receipt_token: token,
            attributes,
            message_attributes: self.message_attributes.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryQueue {
    messages: Arc<Mutex<Vec<StoredMessage>>>,
    arrivals: Arc<Notify>,
    visibility_timeout: Duration,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_VISIBILITY_TIMEOUT)
    }
}

impl MemoryQueue {
    pub fn new(visibility_timeout: Duration) -> Self {
        Self { messages: Arc::new(Mutex::new(Vec::new())), arrivals: Arc::new(Notify::new()), visibility_timeout }
    }

    /// Number of messages in the queue, visible or in flight.
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of messages that have been received and are currently invisible.
    pub async fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.messages.lock().await.iter().filter(|m| m.visible_at > now).count()
    }

    async fn enqueue(&self, body: String, message_attributes: HashMap<String, MessageAttribute>) -> String {
        let message_id = Uuid::new_v4().to_string();
        let attributes =
            HashMap::from([(SENT_TIMESTAMP_ATTRIBUTE.to_string(), Utc::now().timestamp_millis().to_string())]);
        let message = StoredMessage {
            message_id: message_id.clone(),
            body,
            attributes,
            message_attributes,
            receive_count: 0,
            visible_at: Instant::now(),
            receipt_token: None,
        };
        self.messages.lock().await.push(message);
        self.arrivals.notify_waiters();
        trace!("📨️ Message {message_id} enqueued");
        message_id
    }

    /// Delivers the visible messages, or returns the instant at which the next in-flight message becomes visible.
    async fn take_visible(&self, max_messages: usize) -> (Vec<Envelope>, Option<Instant>) {
        let now = Instant::now();
        let mut messages = self.messages.lock().await;
        let delivered = messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(max_messages)
            .map(|m| m.deliver(now, self.visibility_timeout))
            .collect::<Vec<Envelope>>();
        let next_visible = messages.iter().map(|m| m.visible_at).filter(|t| *t > now).min();
        (delivered, next_visible)
    }
}

impl QueueClient for MemoryQueue {
    async fn receive(&self, max_messages: usize, wait_time: Duration) -> Result<Vec<Envelope>, QueueError> {
        let deadline = Instant::now() + wait_time;
        loop {
            let notified = self.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            let (delivered, next_visible) = self.take_visible(max_messages.max(1)).await;
            if !delivered.is_empty() {
                debug!("📨️ Delivering {} message(s)", delivered.len());
                return Ok(delivered);
            }
            let now = Instant::now();
            if now >= deadline {
                // A zero-wait poll must still give other tasks a chance to run
                tokio::task::yield_now().await;
                return Ok(delivered);
            }
            let wake_at = next_visible.map(|t| t.min(deadline)).unwrap_or(deadline);
            let _ = tokio::time::timeout_at(wake_at, notified).await;
        }
    }

    async fn delete(&self, receipt_token: &str) -> Result<(), QueueError> {
        let mut messages = self.messages.lock().await;
        let position = messages.iter().position(|m| m.receipt_token.as_deref() == Some(receipt_token));
        match position {
            Some(index) => {
                let message = messages.remove(index);
                trace!("📨️ Message {} deleted", message.message_id);
                Ok(())
            },
            None => Err(QueueError::ReceiptNotFound(receipt_token.to_string())),
        }
    }

    async fn send(&self, body: String, attributes: HashMap<String, MessageAttribute>) -> Result<String, QueueError> {
        if body.is_empty() {
            return Err(QueueError::InvalidMessage("The message body must not be empty".into()));
        }
        Ok(self.enqueue(body, attributes).await)
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchEntryResult>, QueueError> {
        check_batch_size(entries.len())?;
        let mut results = Vec::with_capacity(entries.len());
        let mut seen = Vec::with_capacity(entries.len());
        for entry in entries {
            if seen.contains(&entry.id) {
                results.push(BatchEntryResult::Failed { id: entry.id, error: "Batch entry ids must be distinct".into() });
                continue;
            }
            seen.push(entry.id.clone());
            match self.send(entry.body, entry.attributes).await {
                Ok(message_id) => results.push(BatchEntryResult::Sent { id: entry.id, message_id }),
                Err(e) => results.push(BatchEntryResult::Failed { id: entry.id, error: e.to_string() }),
            }
        }
        Ok(results)
    }
}
