use thiserror::Error;

use crate::{
    db_types::OrderId,
    order_state::TransitionError,
    traits::StorageError,
    workflow::services::ServiceError,
};

/// Why an order ended up `FAILED`. The `Display` text is what gets stored as the order's error message.
#[derive(Debug, Clone, Error)]
pub enum FailureReason {
    #[error("Invalid action")]
    InvalidAction,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    OutOfStock(String),
    #[error("{0}")]
    Payment(String),
    #[error("{0}")]
    Service(String),
    #[error("Contract violation. {0}")]
    IllegalTransition(TransitionError),
    #[error("Storage failure. {0}")]
    Storage(StorageError),
}

impl FailureReason {
    pub fn from_inventory_error(e: ServiceError) -> Self {
        match e {
            ServiceError::OutOfStock(msg) => FailureReason::OutOfStock(msg),
            other => FailureReason::Service(other.to_string()),
        }
    }

    pub fn from_payment_error(e: ServiceError) -> Self {
        match e {
            ServiceError::PaymentDeclined(msg) => FailureReason::Payment(msg),
            other => FailureReason::Payment(other.to_string()),
        }
    }

    /// Failures that say something about the payload itself. Resending the same payload fails the same way.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, FailureReason::InvalidAction | FailureReason::Validation(_))
    }
}

#[derive(Debug, Clone, Error)]
pub enum WorkflowError {
    #[error("The order could not be recorded. {0}")]
    CreateFailed(StorageError),
    #[error("Order {order_id} failed. {reason}")]
    OrderFailed { order_id: OrderId, reason: FailureReason },
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("{0}")]
    Transition(#[from] TransitionError),
    #[error("{0}")]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    /// The order this error relates to, if an order record exists for it.
    pub fn order_id(&self) -> Option<&OrderId> {
        match self {
            WorkflowError::OrderFailed { order_id, .. } => Some(order_id),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&FailureReason> {
        match self {
            WorkflowError::OrderFailed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}
