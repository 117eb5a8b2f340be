//! Identifier generation.
use chrono::Utc;
use uuid::Uuid;

use crate::db_types::OrderId;

fn short_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// A fresh order id of the form `ORD<epoch-millis>-<8 hex chars>`.
///
/// The millisecond timestamp keeps ids roughly time-ordered; the random suffix keeps two orders created in the same
/// millisecond apart.
pub fn new_order_id() -> OrderId {
    OrderId(format!("ORD{}-{}", Utc::now().timestamp_millis(), short_suffix()))
}

/// A payment transaction reference, `TXN<epoch-millis>-<8 hex chars>`.
pub fn new_transaction_id() -> String {
    format!("TXN{}-{}", Utc::now().timestamp_millis(), short_suffix())
}
