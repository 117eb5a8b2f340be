use log::*;
use serde_json::Value;
use thiserror::Error;

use crate::{
    consumer::{HandlerError, MessageHandler},
    db_types::{NewTriggerRecord, OrderId, TriggerStatus, TriggerUpdate},
    traits::{StorageError, TriggerManagement},
    trigger::{InvocationEvent, InvocationRecord, InvocationReport},
};

#[derive(Debug, Clone, Error)]
pub enum TriggerError {
    #[error("Invalid eventTime: {0}")]
    InvalidEventTime(String),
    #[error("Malformed message body: {0}")]
    MalformedBody(String),
    #[error("{0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Handler(#[from] HandlerError),
}

pub struct TriggerProcessor<T, H> {
    db: T,
    handler: H,
}

impl<T, H> TriggerProcessor<T, H>
where
    T: TriggerManagement,
    H: MessageHandler,
{
    pub fn new(db: T, handler: H) -> Self {
        Self { db, handler }
    }

    /// Processes every record of a pushed batch, in order. One record's failure never stops the others.
    pub async fn process_event(&self, event: InvocationEvent) -> InvocationReport {
        info!("⚡️ Invocation received with {} record(s)", event.records.len());
        let mut report = InvocationReport::default();
        for record in &event.records {
            match self.process_record(record).await {
                Ok(()) => report.processed.push(record.message_id.clone()),
                Err(e) => {
                    warn!("⚡️ Record {} failed. {e}", record.message_id);
                    report.failed.push(record.message_id.clone());
                },
            }
        }
        info!("⚡️ Invocation complete. {} processed, {} failed", report.processed.len(), report.failed.len());
        report
    }

    async fn process_record(&self, record: &InvocationRecord) -> Result<(), TriggerError> {
        let event_time = match record.event_time() {
            Some(t) => t,
            None => {
                let e = TriggerError::InvalidEventTime(record.sent_timestamp().unwrap_or("missing").to_string());
                self.store_failed_trigger(record, e.to_string()).await;
                return Err(e);
            },
        };
        let body = match serde_json::from_str::<Value>(&record.body) {
            Ok(body) => body,
            Err(e) => {
                let e = TriggerError::MalformedBody(e.to_string());
                self.store_failed_trigger(record, e.to_string()).await;
                return Err(e);
            },
        };
        let new_trigger = NewTriggerRecord::received(&record.message_id, &record.event_source, event_time, body.clone());
        let trigger = match self.db.insert_trigger(new_trigger).await {
            Ok(trigger) => trigger,
            Err(e) => {
                let e = TriggerError::Storage(e);
                self.store_failed_trigger(record, e.to_string()).await;
                return Err(e);
            },
        };
        debug!("⚡️ Trigger #{} stored for message {}", trigger.id, record.message_id);
        if let Err(e) = self.db.update_trigger(trigger.id, TriggerUpdate::status(TriggerStatus::Processing)).await {
            error!("⚡️ Could not mark trigger #{} as processing. {e}", trigger.id);
            let e = TriggerError::Storage(e);
            let update = TriggerUpdate::status(TriggerStatus::Failed).with_error(e.to_string());
            self.fail_trigger(trigger.id, record, update).await;
            return Err(e);
        }
        match self.handler.handle(&body).await {
            Ok(receipt) => {
                let order_id = receipt.reference.map(OrderId::from);
                let update = TriggerUpdate::status(TriggerStatus::Completed).with_order_id(order_id.clone());
                match self.db.update_trigger(trigger.id, update).await {
                    Ok(_) => debug!("⚡️ Trigger #{} completed", trigger.id),
                    Err(e) => {
                        // The handler has already run, so the record still counts as processed
                        error!(
                            "⚡️ Message {} was handled, but trigger #{} could not be marked as completed. {e}",
                            record.message_id, trigger.id
                        );
                        let update = TriggerUpdate::status(TriggerStatus::Failed)
                            .with_error(format!("Handled, but the completion could not be recorded. {e}"))
                            .with_order_id(order_id);
                        self.fail_trigger(trigger.id, record, update).await;
                    },
                }
                Ok(())
            },
            Err(e) => {
                let update = TriggerUpdate::status(TriggerStatus::Failed)
                    .with_error(e.message.clone())
                    .with_order_id(e.reference.clone().map(OrderId::from));
                self.fail_trigger(trigger.id, record, update).await;
                Err(TriggerError::Handler(e))
            },
        }
    }

    /// Moves a stored trigger to `FAILED`. If the trigger cannot be updated, a standalone `FAILED` trigger is stored
    /// instead so the failure is still on record.
    async fn fail_trigger(&self, id: i64, record: &InvocationRecord, update: TriggerUpdate) {
        let error = update.error.clone().unwrap_or_default();
        if let Err(e) = self.db.update_trigger(id, update).await {
            error!("⚡️ Could not mark trigger #{id} as failed. {e}");
            self.store_failed_trigger(record, error).await;
        }
    }

    /// Stores a standalone `FAILED` trigger for a record that has no usable `RECEIVED` trigger.
    async fn store_failed_trigger(&self, record: &InvocationRecord, error: String) {
        let body = serde_json::from_str::<Value>(&record.body).unwrap_or_else(|_| Value::String(record.body.clone()));
        let failed = NewTriggerRecord::failed(&record.message_id, &record.event_source, body, error);
        if let Err(e) = self.db.insert_trigger(failed).await {
            error!("⚡️ Could not store the failed trigger for message {}. {e}", record.message_id);
        }
    }
}
