//! #  Storage contracts.
//!
//! This module defines the interface contracts that storage *backends* must satisfy to be used by the order pipeline.
//! The pipeline never assumes multi-record transactions: every record is created or updated by an independent,
//! retriable operation.
//!
//! ## Traits
//! * [`OrderManagement`] creates, updates and queries [`crate::db_types::Order`] records. Only the workflow executor
//!   mutates orders.
//! * [`AuditManagement`] stores the raw copy of every inbound message and the per-attempt inbound message records.
//! * [`TriggerManagement`] stores push-invocation records.
mod audit_management;
mod order_management;
mod storage_error;
mod trigger_management;

pub use audit_management::AuditManagement;
pub use order_management::{OrderManagement, OrderQueryFilter};
pub use storage_error::StorageError;
pub use trigger_management::TriggerManagement;
