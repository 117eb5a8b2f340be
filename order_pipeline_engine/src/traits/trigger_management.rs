use crate::{
    db_types::{NewTriggerRecord, TriggerRecord, TriggerUpdate},
    traits::StorageError,
};

/// Storage for push-invocation records.
#[allow(async_fn_in_trait)]
pub trait TriggerManagement: Clone {
    async fn insert_trigger(&self, trigger: NewTriggerRecord) -> Result<TriggerRecord, StorageError>;

    /// Applies the non-empty fields of `update` to the trigger record with internal id `id`.
    async fn update_trigger(&self, id: i64, update: TriggerUpdate) -> Result<TriggerRecord, StorageError>;

    async fn fetch_triggers_for_message(&self, message_id: &str) -> Result<Vec<TriggerRecord>, StorageError>;
}
