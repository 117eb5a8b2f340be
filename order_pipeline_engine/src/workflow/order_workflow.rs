use std::fmt::Debug;

use log::*;
use serde_json::Value;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType, PaymentStatus},
    events::{EventProducers, OrderFailedEvent, OrderShippedEvent},
    helpers::new_order_id,
    traits::OrderManagement,
    workflow::{validate_order, FailureReason, FulfillmentServices, WorkflowError},
};

/// The result of a successful run: the shipped order and the payment transaction reference.
///
/// The transaction reference is not stored on the order. This is the only place it is available.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedOrder {
    pub order: Order,
    pub transaction_id: String,
}

/// A stage failure, together with the most recent persisted version of the order.
type StageFailure = (Order, FailureReason);

/// `OrderWorkflow` is the only component that changes an order's status.
pub struct OrderWorkflow<B, S> {
    db: B,
    services: S,
    producers: EventProducers,
}

impl<B, S> Debug for OrderWorkflow<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderWorkflow")
    }
}

impl<B, S> OrderWorkflow<B, S> {
    pub fn new(db: B, services: S, producers: EventProducers) -> Self {
        Self { db, services, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, S> OrderWorkflow<B, S>
where
    B: OrderManagement,
    S: FulfillmentServices,
{
    /// Runs a raw order payload through the whole workflow.
    ///
    /// An order record is created for every call, even when the payload turns out to be invalid. Calling this twice
    /// with the same payload creates two independent orders.
    pub async fn process_order(&self, payload: &Value) -> Result<ProcessedOrder, WorkflowError> {
        let new_order = NewOrder::from_payload(new_order_id(), payload);
        let order = self.db.insert_order(new_order).await.map_err(|e| {
            error!("🔄️📦️ Could not record a new order. {e}");
            WorkflowError::CreateFailed(e)
        })?;
        debug!("🔄️📦️ Order [{}] created for customer '{}'", order.order_id, order.customer_id);
        match self.run_stages(order, payload).await {
            Ok((order, transaction_id)) => {
                if let Err(e) = self.services.notify_customer(&order).await {
                    warn!("🔄️📧️ Customer for order [{}] was not notified. {e}", order.order_id);
                }
                info!("🔄️📦️ Order [{}] processed successfully. Transaction {transaction_id}", order.order_id);
                self.producers.publish_order_shipped(OrderShippedEvent::new(order.clone(), transaction_id.clone())).await;
                Ok(ProcessedOrder { order, transaction_id })
            },
            Err((order, reason)) => Err(self.fail_order(order, reason).await),
        }
    }

    /// Marks a shipped order as delivered.
    pub async fn confirm_delivery(&self, order_id: &OrderId) -> Result<Order, WorkflowError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await?
            .ok_or_else(|| WorkflowError::OrderNotFound(order_id.clone()))?;
        let delivered = order.apply(OrderStatusType::Delivered, None)?;
        let delivered = self.db.update_order(&delivered).await?;
        info!("🔄️📦️ Order [{order_id}] delivered");
        Ok(delivered)
    }

    async fn run_stages(&self, order: Order, payload: &Value) -> Result<(Order, String), StageFailure> {
        let validated = match validate_order(payload) {
            Ok(v) => v,
            Err(reason) => return Err((order, reason)),
        };
        let order = self.transition(order, OrderStatusType::Processing).await?;
        if let Err(e) = self.services.check_inventory(&validated.items).await {
            return Err((order, FailureReason::from_inventory_error(e)));
        }
        let transaction_id = match self.services.charge_payment(&order.order_id, validated.total_amount).await {
            Ok(txn) => txn,
            Err(e) => return Err((order, FailureReason::from_payment_error(e))),
        };
        let paid = match order
            .settle_payment(PaymentStatus::Completed)
            .and_then(|o| o.apply(OrderStatusType::PaymentCompleted, None))
        {
            Ok(paid) => paid,
            Err(e) => return Err((order, FailureReason::IllegalTransition(e))),
        };
        let order = self.persist(order, paid).await?;
        let order = self.transition(order, OrderStatusType::Shipped).await?;
        Ok((order, transaction_id))
    }

    async fn transition(&self, order: Order, target: OrderStatusType) -> Result<Order, StageFailure> {
        match order.apply(target, None) {
            Ok(updated) => self.persist(order, updated).await,
            Err(e) => Err((order, FailureReason::IllegalTransition(e))),
        }
    }

    async fn persist(&self, previous: Order, updated: Order) -> Result<Order, StageFailure> {
        match self.db.update_order(&updated).await {
            Ok(saved) => {
                trace!("🔄️📦️ Order [{}] is now {}", saved.order_id, saved.status);
                Ok(saved)
            },
            Err(e) => Err((previous, FailureReason::Storage(e))),
        }
    }

    /// Moves the order to `FAILED` and builds the error for the caller. Failing to record the failure is logged; the
    /// original reason is still what gets returned.
    async fn fail_order(&self, order: Order, reason: FailureReason) -> WorkflowError {
        let order_id = order.order_id.clone();
        match &reason {
            FailureReason::IllegalTransition(e) => error!("🔄️📦️ Contract violation while processing [{order_id}]. {e}"),
            FailureReason::Storage(e) => error!("🔄️📦️ Storage failure while processing [{order_id}]. {e}"),
            r => warn!("🔄️📦️ Order [{order_id}] failed. {r}"),
        }
        let message = reason.to_string();
        match order.apply(OrderStatusType::Failed, Some(message.clone())) {
            Ok(failed) => {
                let failed = match reason {
                    FailureReason::Payment(_) => failed.settle_payment(PaymentStatus::Failed).unwrap_or(failed),
                    _ => failed,
                };
                match self.db.update_order(&failed).await {
                    Ok(saved) => self.producers.publish_order_failed(OrderFailedEvent::new(saved, message)).await,
                    Err(e) => error!("🔄️📦️ Could not mark order [{order_id}] as failed. {e}"),
                }
            },
            Err(e) => error!("🔄️📦️ Contract violation. Order [{order_id}] cannot be marked as failed. {e}"),
        }
        WorkflowError::OrderFailed { order_id, reason }
    }
}
