#![allow(dead_code)]
//! Shared fixtures for the integration tests: a throwaway SQLite database, recording fakes for the queue, the audit
//! store and the message handler, and a trigger store that fails on demand. The recording fakes append to a shared
//! [`CallLog`] so tests can assert on the order in which the consumer talks to its collaborators.
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::Utc;
use log::*;
use order_pipeline_engine::{
    consumer::{HandlerError, HandlerReceipt, MessageHandler},
    db_types::{
        MessageRecord,
        MessageStatus,
        NewMessageRecord,
        NewRawRecord,
        NewTriggerRecord,
        RawRecord,
        TriggerRecord,
        TriggerStatus,
        TriggerUpdate,
    },
    queue::{BatchEntry, BatchEntryResult, Envelope, MessageAttribute, QueueClient, QueueError},
    AuditManagement,
    SqliteDatabase,
    StorageError,
    TriggerManagement,
};
use serde_json::Value;
use sqlx::{migrate::MigrateDatabase, Sqlite};

pub async fn prepare_db() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("opl_it_{}.db", rand::random::<u64>()));
    let url = format!("sqlite://{}", path.display());
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error connecting to database");
    db.run_migrations().await.expect("Error running migrations");
    debug!("🚀️ Test database ready at {url}");
    db
}

pub async fn tear_down(db: SqliteDatabase) {
    db.close().await;
    if let Err(e) = Sqlite::drop_database(db.url()).await {
        warn!("🚀️ Could not drop test database {}: {e}", db.url());
    }
}

pub fn envelope(message_id: &str, body: &str) -> Envelope {
    Envelope {
        message_id: message_id.to_string(),
        body: body.to_string(),
        receipt_token: format!("receipt-{message_id}"),
        attributes: HashMap::from([("SentTimestamp".to_string(), "1729339200000".to_string())]),
        message_attributes: HashMap::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Receive,
    Raw(String),
    Handle(String),
    Record(String, MessageStatus),
    Delete(String),
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.0.lock().unwrap().iter().position(|c| c == call)
    }
}

//--------------------------------------   RecordingQueue   ------------------------------------------------------------
/// Hands out scripted batches. Once the script is exhausted, every receive waits out its long-poll and returns
/// nothing.
#[derive(Clone, Default)]
pub struct RecordingQueue {
    log: CallLog,
    batches: Arc<Mutex<VecDeque<Result<Vec<Envelope>, QueueError>>>>,
    failing_deletes: Arc<Mutex<Vec<String>>>,
}

impl RecordingQueue {
    pub fn new(log: CallLog) -> Self {
        Self { log, ..Default::default() }
    }

    pub fn push_batch(&self, batch: Vec<Envelope>) {
        self.batches.lock().unwrap().push_back(Ok(batch));
    }

    pub fn push_error(&self, error: QueueError) {
        self.batches.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_delete_for(&self, receipt_token: &str) {
        self.failing_deletes.lock().unwrap().push(receipt_token.to_string());
    }
}

impl QueueClient for RecordingQueue {
    async fn receive(&self, _max_messages: usize, wait_time: Duration) -> Result<Vec<Envelope>, QueueError> {
        self.log.push(Call::Receive);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                tokio::time::sleep(wait_time.max(Duration::from_millis(1))).await;
                Ok(Vec::new())
            },
        }
    }

    async fn delete(&self, receipt_token: &str) -> Result<(), QueueError> {
        self.log.push(Call::Delete(receipt_token.to_string()));
        if self.failing_deletes.lock().unwrap().iter().any(|t| t == receipt_token) {
            return Err(QueueError::ReceiptNotFound(receipt_token.to_string()));
        }
        Ok(())
    }

    async fn send(&self, _body: String, _attributes: HashMap<String, MessageAttribute>) -> Result<String, QueueError> {
        Err(QueueError::Transport("RecordingQueue does not send".into()))
    }

    async fn send_batch(&self, _entries: Vec<BatchEntry>) -> Result<Vec<BatchEntryResult>, QueueError> {
        Err(QueueError::Transport("RecordingQueue does not send".into()))
    }
}

//--------------------------------------   RecordingAudit   ------------------------------------------------------------
#[derive(Clone, Default)]
pub struct RecordingAudit {
    log: CallLog,
    raw: Arc<Mutex<Vec<NewRawRecord>>>,
    records: Arc<Mutex<Vec<NewMessageRecord>>>,
    fail_raw: bool,
    fail_records: bool,
}

impl RecordingAudit {
    pub fn new(log: CallLog) -> Self {
        Self { log, ..Default::default() }
    }

    pub fn failing_raw_records(mut self) -> Self {
        self.fail_raw = true;
        self
    }

    pub fn failing_message_records(mut self) -> Self {
        self.fail_records = true;
        self
    }

    pub fn raw_records(&self) -> Vec<NewRawRecord> {
        self.raw.lock().unwrap().clone()
    }

    pub fn message_records(&self) -> Vec<NewMessageRecord> {
        self.records.lock().unwrap().clone()
    }

    fn to_record(id: usize, record: NewMessageRecord) -> MessageRecord {
        MessageRecord {
            id: id as i64,
            message_id: record.message_id,
            body: record.body,
            message_type: record.message_type,
            status: record.status,
            error: record.error,
            order_id: record.order_id,
            processed_at: record.processed_at,
        }
    }
}

impl AuditManagement for RecordingAudit {
    async fn insert_raw_record(&self, record: NewRawRecord) -> Result<i64, StorageError> {
        self.log.push(Call::Raw(record.message_id.clone()));
        if self.fail_raw {
            return Err(StorageError::DatabaseError("raw records are unavailable".into()));
        }
        let mut raw = self.raw.lock().unwrap();
        raw.push(record);
        Ok(raw.len() as i64)
    }

    async fn insert_message_record(&self, record: NewMessageRecord) -> Result<MessageRecord, StorageError> {
        self.log.push(Call::Record(record.message_id.clone(), record.status));
        if self.fail_records {
            return Err(StorageError::DatabaseError("message records are unavailable".into()));
        }
        let mut records = self.records.lock().unwrap();
        records.push(record.clone());
        Ok(Self::to_record(records.len(), record))
    }

    async fn fetch_message_records(&self, message_id: &str) -> Result<Vec<MessageRecord>, StorageError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.message_id == message_id)
            .map(|(i, r)| Self::to_record(i + 1, r.clone()))
            .collect())
    }

    async fn fetch_raw_records(&self, message_id: &str) -> Result<Vec<RawRecord>, StorageError> {
        let raw = self.raw.lock().unwrap();
        Ok(raw
            .iter()
            .enumerate()
            .filter(|(_, r)| r.message_id == message_id)
            .map(|(i, r)| RawRecord {
                id: i as i64 + 1,
                message_id: r.message_id.clone(),
                payload: r.payload.clone(),
                received_at: r.received_at,
            })
            .collect())
    }

    async fn fetch_recent_message_records(&self, limit: i64) -> Result<Vec<MessageRecord>, StorageError> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .enumerate()
            .rev()
            .take(limit.max(0) as usize)
            .map(|(i, r)| Self::to_record(i + 1, r.clone()))
            .collect())
    }
}

//--------------------------------------  RecordingHandler  ------------------------------------------------------------
/// Succeeds unless the body has `"fail": true`. Logs the body's `id` field.
#[derive(Clone, Default)]
pub struct RecordingHandler {
    log: CallLog,
    delay: Duration,
}

impl RecordingHandler {
    pub fn new(log: CallLog) -> Self {
        Self { log, delay: Duration::ZERO }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl MessageHandler for RecordingHandler {
    async fn handle(&self, body: &Value) -> Result<HandlerReceipt, HandlerError> {
        let id = body["id"].as_str().unwrap_or_default().to_string();
        self.log.push(Call::Handle(id.clone()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if body["fail"].as_bool().unwrap_or(false) {
            Err(HandlerError::new(format!("Handler refused {id}")).with_reference(format!("ORD-{id}")))
        } else {
            Ok(HandlerReceipt::with_reference(format!("ORD-{id}")))
        }
    }
}

//--------------------------------------    FlakyTriggers     ------------------------------------------------------------
/// An in-memory trigger store that refuses to write chosen statuses.
#[derive(Clone, Default)]
pub struct FlakyTriggers {
    triggers: Arc<Mutex<Vec<TriggerRecord>>>,
    failing_inserts: Vec<TriggerStatus>,
    failing_updates: Vec<TriggerStatus>,
}

impl FlakyTriggers {
    pub fn failing_insert_of(mut self, status: TriggerStatus) -> Self {
        self.failing_inserts.push(status);
        self
    }

    pub fn failing_update_to(mut self, status: TriggerStatus) -> Self {
        self.failing_updates.push(status);
        self
    }

    pub fn triggers(&self) -> Vec<TriggerRecord> {
        self.triggers.lock().unwrap().clone()
    }
}

impl TriggerManagement for FlakyTriggers {
    async fn insert_trigger(&self, trigger: NewTriggerRecord) -> Result<TriggerRecord, StorageError> {
        if self.failing_inserts.contains(&trigger.status) {
            return Err(StorageError::DatabaseError(format!("cannot insert {} triggers", trigger.status)));
        }
        let mut triggers = self.triggers.lock().unwrap();
        let now = Utc::now();
        let record = TriggerRecord {
            id: triggers.len() as i64 + 1,
            message_id: trigger.message_id,
            event_source: trigger.event_source,
            event_time: trigger.event_time,
            body: trigger.body,
            status: trigger.status,
            error: trigger.error,
            order_id: None,
            created_at: now,
            updated_at: now,
        };
        triggers.push(record.clone());
        Ok(record)
    }

    async fn update_trigger(&self, id: i64, update: TriggerUpdate) -> Result<TriggerRecord, StorageError> {
        if update.status.is_some_and(|s| self.failing_updates.contains(&s)) {
            return Err(StorageError::DatabaseError("trigger updates are unavailable".into()));
        }
        let mut triggers = self.triggers.lock().unwrap();
        let trigger = triggers.iter_mut().find(|t| t.id == id).ok_or(StorageError::TriggerNotFound(id))?;
        if let Some(status) = update.status {
            trigger.status = status;
        }
        if update.error.is_some() {
            trigger.error = update.error;
        }
        if update.order_id.is_some() {
            trigger.order_id = update.order_id;
        }
        trigger.updated_at = Utc::now();
        Ok(trigger.clone())
    }

    async fn fetch_triggers_for_message(&self, message_id: &str) -> Result<Vec<TriggerRecord>, StorageError> {
        Ok(self.triggers().into_iter().filter(|t| t.message_id == message_id).collect())
    }
}
