//! Order Pipeline Engine
//!
//! A queue-driven, at-least-once order processing pipeline. Messages describing orders arrive on a queue; a consumer
//! pulls them, runs them through the order workflow and keeps an audit trail of every inbound message.
//!
//! The library is organised bottom-up:
//! 1. The domain model ([`mod@db_types`]) and the order state machine ([`mod@order_state`]), which owns the legal
//!    status transitions.
//! 2. Storage contracts ([`mod@traits`]) and the SQLite backend, [`SqliteDatabase`]. The pipeline never relies on
//!    multi-record transactions.
//! 3. The queue contract ([`mod@queue`]) with SQS and in-memory implementations, and a producer helper.
//! 4. The order workflow ([`mod@workflow`]), the only component that changes order status.
//! 5. The consumer loop ([`mod@consumer`]), which owns the decision of when a message is acknowledged, and the
//!    push-invocation [`mod@trigger`] processor.
//!
//! Integrators can hook into order lifecycle [`mod@events`] (shipped, failed) with async handlers.
pub mod consumer;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod order_state;
pub mod queue;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;
pub mod trigger;
pub mod workflow;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use consumer::{ConsumerConfig, ConsumerStats, MessageHandler, OrderMessageHandler, QueueConsumer};
pub use order_state::TransitionError;
pub use queue::{MemoryQueue, OrderProducer, QueueClient};
#[cfg(feature = "sqs")]
pub use queue::{SqsConfig, SqsQueue};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{AuditManagement, OrderManagement, StorageError, TriggerManagement};
pub use trigger::TriggerProcessor;
pub use workflow::{OrderWorkflow, SimulatedServices};
