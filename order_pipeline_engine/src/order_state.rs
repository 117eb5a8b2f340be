//! # Order state machine
//!
//! Legal status transitions for an [`Order`]:
//!
//! | From \ To          | Processing | PaymentCompleted | Shipped | Delivered | Failed |
//! |--------------------|------------|------------------|---------|-----------|--------|
//! | New                | Ok         | Err              | Err     | Err       | Ok     |
//! | Processing         | Err        | Ok               | Err     | Err       | Ok     |
//! | PaymentCompleted   | Err        | Err              | Ok      | Err       | Ok     |
//! | Shipped            | Err        | Err              | Err     | Ok        | Ok     |
//! | Delivered, Failed  | Err        | Err              | Err     | Err       | Err    |
//!
//! Nothing ever transitions back to `New`. Applying a transition is a pure operation on an in-memory order; the caller
//! persists the result.
use chrono::Utc;
use thiserror::Error;

use crate::db_types::{Order, OrderId, OrderStatusType, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Order {order_id} is {status}, which is terminal. It cannot move to {target}.")]
    Terminal { order_id: OrderId, status: OrderStatusType, target: OrderStatusType },
    #[error("Order {order_id} cannot move from {from} to {to}.")]
    IllegalTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("The payment for order {order_id} is already {status}. It cannot become {target}.")]
    PaymentAlreadySettled { order_id: OrderId, status: PaymentStatus, target: PaymentStatus },
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Delivered | OrderStatusType::Failed)
    }

    /// The next status on the happy path, if there is one.
    pub fn successor(&self) -> Option<OrderStatusType> {
        use OrderStatusType::*;
        match self {
            New => Some(Processing),
            Processing => Some(PaymentCompleted),
            PaymentCompleted => Some(Shipped),
            Shipped => Some(Delivered),
            Delivered | Failed => None,
        }
    }

    pub fn can_transition_to(&self, target: OrderStatusType) -> bool {
        if self.is_terminal() {
            return false;
        }
        target == OrderStatusType::Failed || self.successor() == Some(target)
    }
}

impl PaymentStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl Order {
    /// Moves the order to `target`, returning the updated order.
    ///
    /// `reason` is recorded as the order's error message; it is normally only supplied when failing an order.
    /// `updated_at` is refreshed on every successful transition. The original order is left untouched on error.
    pub fn apply(&self, target: OrderStatusType, reason: Option<String>) -> Result<Order, TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal { order_id: self.order_id.clone(), status: self.status, target });
        }
        if !self.status.can_transition_to(target) {
            return Err(TransitionError::IllegalTransition {
                order_id: self.order_id.clone(),
                from: self.status,
                to: target,
            });
        }
        let mut order = self.clone();
        order.status = target;
        if reason.is_some() {
            order.error_message = reason;
        }
        order.updated_at = Utc::now();
        Ok(order)
    }

    /// Settles the payment sub-status. Only `Pending` payments can be settled, and only once.
    pub fn settle_payment(&self, outcome: PaymentStatus) -> Result<Order, TransitionError> {
        if self.payment_status.is_settled() || outcome == PaymentStatus::Pending {
            return Err(TransitionError::PaymentAlreadySettled {
                order_id: self.order_id.clone(),
                status: self.payment_status,
                target: outcome,
            });
        }
        let mut order = self.clone();
        order.payment_status = outcome;
        order.updated_at = Utc::now();
        Ok(order)
    }
}
