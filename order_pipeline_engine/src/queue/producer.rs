use std::collections::HashMap;

use log::*;
use serde_json::Value;

use crate::queue::{BatchEntry, BatchEntryResult, MessageAttribute, QueueClient, QueueError, MAX_BATCH_SIZE};

/// Publishes order payloads to a queue, tagging every message as a new order.
#[derive(Debug, Clone)]
pub struct OrderProducer<Q> {
    queue: Q,
}

impl<Q: QueueClient> OrderProducer<Q> {
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// The message attributes attached to every order message.
    pub fn order_attributes() -> HashMap<String, MessageAttribute> {
        HashMap::from([
            ("OrderType".to_string(), MessageAttribute::string("NEW_ORDER")),
            ("Priority".to_string(), MessageAttribute::number(1)),
        ])
    }

    /// Sends a single order and returns the queue's message id.
    pub async fn send_order(&self, payload: &Value) -> Result<String, QueueError> {
        let message_id = self.queue.send(payload.to_string(), Self::order_attributes()).await?;
        info!("📨️ Order message {message_id} sent");
        Ok(message_id)
    }

    /// Sends any number of orders, split into batches the queue accepts.
    ///
    /// Entry ids are `msg{index}`, where `index` is the payload's position in `payloads`. One outcome is returned per
    /// payload, in order. A batch that fails outright marks each of its entries as failed; the remaining batches are
    /// still sent.
    pub async fn send_orders(&self, payloads: &[Value]) -> Vec<BatchEntryResult> {
        let mut results = Vec::with_capacity(payloads.len());
        for (chunk_no, chunk) in payloads.chunks(MAX_BATCH_SIZE).enumerate() {
            let offset = chunk_no * MAX_BATCH_SIZE;
            let entries = chunk
                .iter()
                .enumerate()
                .map(|(i, payload)| {
                    BatchEntry::new(format!("msg{}", offset + i), payload.to_string())
                        .with_attributes(Self::order_attributes())
                })
                .collect::<Vec<BatchEntry>>();
            let ids = entries.iter().map(|e| e.id.clone()).collect::<Vec<String>>();
            match self.queue.send_batch(entries).await {
                Ok(outcomes) => results.extend(outcomes),
                Err(e) => {
                    error!("📨️ Batch {chunk_no} could not be sent. {e}");
                    results.extend(ids.into_iter().map(|id| BatchEntryResult::Failed { id, error: e.to_string() }));
                },
            }
        }
        let sent = results.iter().filter(|r| r.is_sent()).count();
        info!("📨️ {sent} of {} order messages sent", results.len());
        results
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::queue::MemoryQueue;

    #[tokio::test]
    async fn order_messages_carry_order_attributes() {
        let producer = OrderProducer::new(MemoryQueue::default());
        let id = producer.send_order(&json!({"action": "processOrder"})).await.unwrap();
        let received = producer.queue().receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(received[0].message_id, id);
        assert_eq!(received[0].message_attributes["OrderType"], MessageAttribute::string("NEW_ORDER"));
        assert_eq!(received[0].message_attributes["Priority"].data_type, "Number");
        assert_eq!(received[0].message_attributes["Priority"].string_value.as_deref(), Some("1"));
        let body: Value = serde_json::from_str(&received[0].body).unwrap();
        assert_eq!(body["action"], "processOrder");
    }

    #[tokio::test]
    async fn large_sends_are_partitioned() {
        let producer = OrderProducer::new(MemoryQueue::default());
        let payloads = (0..23).map(|i| json!({"n": i})).collect::<Vec<_>>();
        let results = producer.send_orders(&payloads).await;
        assert_eq!(results.len(), 23);
        assert!(results.iter().all(|r| r.is_sent()));
        assert_eq!(results[0].id(), "msg0");
        assert_eq!(results[10].id(), "msg10");
        assert_eq!(results[22].id(), "msg22");
        assert_eq!(producer.queue().len().await, 23);
    }

    #[tokio::test]
    async fn no_payloads_sends_nothing() {
        let producer = OrderProducer::new(MemoryQueue::default());
        assert!(producer.send_orders(&[]).await.is_empty());
    }
}
