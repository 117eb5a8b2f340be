use serde::Serialize;

use crate::db_types::Order;

/// Emitted once an order's `SHIPPED` status has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderShippedEvent {
    pub order: Order,
    pub transaction_id: String,
}

impl OrderShippedEvent {
    pub fn new(order: Order, transaction_id: String) -> Self {
        Self { order, transaction_id }
    }
}

/// Emitted once an order's `FAILED` status has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFailedEvent {
    pub order: Order,
    pub reason: String,
}

impl OrderFailedEvent {
    pub fn new(order: Order, reason: String) -> Self {
        Self { order, reason }
    }
}
