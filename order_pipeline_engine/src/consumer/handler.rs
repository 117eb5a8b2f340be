use log::*;
use serde_json::Value;
use thiserror::Error;

use crate::{
    traits::OrderManagement,
    workflow::{FulfillmentServices, OrderWorkflow},
};

/// Successful handling of a message body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerReceipt {
    /// The id of the business record the message produced, if any.
    pub reference: Option<String>,
}

impl HandlerReceipt {
    pub fn with_reference<S: Into<String>>(reference: S) -> Self {
        Self { reference: Some(reference.into()) }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub message: String,
    /// The id of the business record the failed message produced, if any.
    pub reference: Option<String>,
}

impl HandlerError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into(), reference: None }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Business processing of one parsed message body. The consumer loop knows nothing else about what a message means.
#[allow(async_fn_in_trait)]
pub trait MessageHandler {
    async fn handle(&self, body: &Value) -> Result<HandlerReceipt, HandlerError>;
}

/// Feeds message bodies to the [`OrderWorkflow`].
#[derive(Debug)]
pub struct OrderMessageHandler<B, S> {
    workflow: OrderWorkflow<B, S>,
}

impl<B, S> OrderMessageHandler<B, S> {
    pub fn new(workflow: OrderWorkflow<B, S>) -> Self {
        Self { workflow }
    }

    pub fn workflow(&self) -> &OrderWorkflow<B, S> {
        &self.workflow
    }
}

impl<B, S> MessageHandler for OrderMessageHandler<B, S>
where
    B: OrderManagement,
    S: FulfillmentServices,
{
    async fn handle(&self, body: &Value) -> Result<HandlerReceipt, HandlerError> {
        match self.workflow.process_order(body).await {
            Ok(processed) => Ok(HandlerReceipt::with_reference(processed.order.order_id.to_string())),
            Err(e) => {
                trace!("🕰️ Order workflow reported an error. {e}");
                let message = e.reason().map(ToString::to_string).unwrap_or_else(|| e.to_string());
                let reference = e.order_id().map(ToString::to_string);
                Err(HandlerError { message, reference })
            },
        }
    }
}
