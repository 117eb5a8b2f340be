//! # Push invocation
//!
//! When the pipeline is invoked by an event-delivery mechanism instead of polling for itself, it receives a batch of
//! records and must report which of them failed. [`TriggerProcessor`] handles such a batch and keeps a
//! [`crate::db_types::TriggerRecord`] for every record, tracking `RECEIVED → PROCESSING → COMPLETED | FAILED`.
mod event;
mod processor;

pub use event::{InvocationEvent, InvocationRecord, InvocationReport};
pub use processor::{TriggerError, TriggerProcessor};
