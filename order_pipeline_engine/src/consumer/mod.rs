//! # Consumer loop
//!
//! [`QueueConsumer`] repeatedly long-polls a [`crate::queue::QueueClient`] and runs every received envelope through
//! the same fixed sequence:
//!
//! 1. store a raw copy of the envelope (failures are logged and ignored),
//! 2. parse the body as JSON (a malformed body is recorded as `FAILED` and left on the queue),
//! 3. call the [`MessageHandler`],
//! 4. on success, store a `PROCESSED` message record and only then delete the envelope,
//! 5. on failure, store a `FAILED` message record and leave the envelope for redelivery.
//!
//! Nothing that happens to a single envelope stops the loop. Only a failed receive call pauses it, for a fixed
//! backoff. A cancellation token stops the loop between batches; an envelope that is being processed is always
//! finished.
mod config;
mod consumer_loop;
mod handler;

pub use config::{ConsumerConfig, DEFAULT_ERROR_BACKOFF, DEFAULT_WAIT_TIME};
pub use consumer_loop::{ConsumerStats, EnvelopeOutcome, QueueConsumer};
pub use handler::{HandlerError, HandlerReceipt, MessageHandler, OrderMessageHandler};
