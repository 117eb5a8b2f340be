//! Order lifecycle hooks.
//!
//! Integrators register async hooks in [`EventHooks`], build [`EventHandlers`] from them, hand the resulting
//! [`EventProducers`] to the workflow and start the handlers. Events are only published after the corresponding
//! order change has been persisted.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
