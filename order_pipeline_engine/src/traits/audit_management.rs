use crate::{
    db_types::{MessageRecord, NewMessageRecord, NewRawRecord, RawRecord},
    traits::StorageError,
};

/// The `AuditManagement` trait defines how the forensic trail of inbound messages is stored.
///
/// Records are append-only. Nothing here is ever updated or deleted, and duplicates (from queue redelivery) are
/// expected.
#[allow(async_fn_in_trait)]
pub trait AuditManagement: Clone {
    /// Stores an unstructured copy of an inbound message. Returns the internal id of the new record.
    async fn insert_raw_record(&self, record: NewRawRecord) -> Result<i64, StorageError>;

    /// Stores the outcome of one processing attempt of a message.
    async fn insert_message_record(&self, record: NewMessageRecord) -> Result<MessageRecord, StorageError>;

    /// All processing records for the given queue message id, oldest first.
    async fn fetch_message_records(&self, message_id: &str) -> Result<Vec<MessageRecord>, StorageError>;

    /// All raw copies of the given queue message id, oldest first.
    async fn fetch_raw_records(&self, message_id: &str) -> Result<Vec<RawRecord>, StorageError>;

    /// The most recent processing records across all messages, newest first.
    async fn fetch_recent_message_records(&self, limit: i64) -> Result<Vec<MessageRecord>, StorageError>;
}
