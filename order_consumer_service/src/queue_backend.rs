use std::{collections::HashMap, time::Duration};

#[cfg(feature = "sqs")]
use order_pipeline_engine::SqsQueue;
use order_pipeline_engine::{
    queue::{BatchEntry, BatchEntryResult, Envelope, MessageAttribute, QueueError},
    MemoryQueue,
    QueueClient,
};

/// The queue the service consumes from, selected by `OPL_QUEUE_BACKEND`.
#[derive(Debug, Clone)]
pub enum ServiceQueue {
    #[cfg(feature = "sqs")]
    Sqs(SqsQueue),
    Memory(MemoryQueue),
}

impl QueueClient for ServiceQueue {
    async fn receive(&self, max_messages: usize, wait_time: Duration) -> Result<Vec<Envelope>, QueueError> {
        match self {
            #[cfg(feature = "sqs")]
            Self::Sqs(q) => q.receive(max_messages, wait_time).await,
            Self::Memory(q) => q.receive(max_messages, wait_time).await,
        }
    }

    async fn delete(&self, receipt_token: &str) -> Result<(), QueueError> {
        match self {
            #[cfg(feature = "sqs")]
            Self::Sqs(q) => q.delete(receipt_token).await,
            Self::Memory(q) => q.delete(receipt_token).await,
        }
    }

    async fn send(&self, body: String, attributes: HashMap<String, MessageAttribute>) -> Result<String, QueueError> {
        match self {
            #[cfg(feature = "sqs")]
            Self::Sqs(q) => q.send(body, attributes).await,
            Self::Memory(q) => q.send(body, attributes).await,
        }
    }

    async fn send_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchEntryResult>, QueueError> {
        match self {
            #[cfg(feature = "sqs")]
            Self::Sqs(q) => q.send_batch(entries).await,
            Self::Memory(q) => q.send_batch(entries).await,
        }
    }
}
