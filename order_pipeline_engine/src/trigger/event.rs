use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::queue::SENT_TIMESTAMP_ATTRIBUTE;

/// A batch of pushed queue records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<InvocationRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRecord {
    pub message_id: String,
    #[serde(default)]
    pub receipt_handle: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub event_source: String,
}

impl InvocationRecord {
    /// The raw `SentTimestamp` attribute, if present.
    pub fn sent_timestamp(&self) -> Option<&str> {
        self.attributes.get(SENT_TIMESTAMP_ATTRIBUTE).map(String::as_str)
    }

    /// Interprets `SentTimestamp` as epoch milliseconds, falling back to an RFC 3339 timestamp.
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.sent_timestamp()?.trim();
        match raw.parse::<i64>() {
            Ok(ms) => Utc.timestamp_millis_opt(ms).single(),
            Err(_) => DateTime::parse_from_rfc3339(raw).ok().map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// The outcome of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationReport {
    pub processed: Vec<String>,
    pub failed: Vec<String>,
}

impl InvocationReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// The partial batch failure response understood by the push mechanism: the ids of the records to redeliver.
    pub fn batch_item_failures(&self) -> Value {
        let failures = self.failed.iter().map(|id| json!({ "itemIdentifier": id })).collect::<Vec<Value>>();
        json!({ "batchItemFailures": failures })
    }
}
