//! External collaborators of the order workflow: inventory, payment and customer notification.
//!
//! [`SimulatedServices`] stands in for all three. It fails inventory checks and payment charges at a configurable
//! random rate and can add artificial latency to every call.
use std::time::Duration;

use log::*;
use thiserror::Error;

use crate::{
    db_types::{LineItem, Order, OrderId},
    helpers::new_transaction_id,
};

pub const DEFAULT_INVENTORY_FAILURE_RATE: f64 = 0.1;
pub const DEFAULT_PAYMENT_FAILURE_RATE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{0}")]
    OutOfStock(String),
    #[error("{0}")]
    PaymentDeclined(String),
    #[error("Notification could not be delivered. {0}")]
    NotificationFailed(String),
    #[error("The service is unavailable. {0}")]
    Unavailable(String),
}

#[allow(async_fn_in_trait)]
pub trait FulfillmentServices {
    /// Succeeds if every line item is available in the requested quantity.
    async fn check_inventory(&self, items: &[LineItem]) -> Result<(), ServiceError>;

    /// Charges `amount` for the order and returns the payment transaction reference.
    async fn charge_payment(&self, order_id: &OrderId, amount: f64) -> Result<String, ServiceError>;

    async fn notify_customer(&self, order: &Order) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SimulatedServices {
    inventory_failure_rate: f64,
    payment_failure_rate: f64,
    latency: Duration,
}

impl Default for SimulatedServices {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_FAILURE_RATE, DEFAULT_PAYMENT_FAILURE_RATE, Duration::ZERO)
    }
}

impl SimulatedServices {
    /// Failure rates are probabilities and are clamped to `0.0..=1.0`.
    pub fn new(inventory_failure_rate: f64, payment_failure_rate: f64, latency: Duration) -> Self {
        Self {
            inventory_failure_rate: inventory_failure_rate.clamp(0.0, 1.0),
            payment_failure_rate: payment_failure_rate.clamp(0.0, 1.0),
            latency,
        }
    }

    /// Services that never fail and never wait.
    pub fn reliable() -> Self {
        Self::new(0.0, 0.0, Duration::ZERO)
    }

    pub fn inventory_failure_rate(&self) -> f64 {
        self.inventory_failure_rate
    }

    pub fn payment_failure_rate(&self) -> f64 {
        self.payment_failure_rate
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn roll_failure(rate: f64) -> bool {
        rate > 0.0 && rand::random::<f64>() < rate
    }
}

impl FulfillmentServices for SimulatedServices {
    async fn check_inventory(&self, items: &[LineItem]) -> Result<(), ServiceError> {
        self.simulate_latency().await;
        if Self::roll_failure(self.inventory_failure_rate) {
            return Err(ServiceError::OutOfStock("Some items are out of stock".into()));
        }
        trace!("🔄️📦️ {} line item(s) are in stock", items.len());
        Ok(())
    }

    async fn charge_payment(&self, order_id: &OrderId, amount: f64) -> Result<String, ServiceError> {
        self.simulate_latency().await;
        if Self::roll_failure(self.payment_failure_rate) {
            return Err(ServiceError::PaymentDeclined("Payment processing failed".into()));
        }
        let txn = new_transaction_id();
        debug!("🔄️💰️ Charged {amount:.2} for order [{order_id}]. Transaction {txn}");
        Ok(txn)
    }

    async fn notify_customer(&self, order: &Order) -> Result<(), ServiceError> {
        info!("🔄️📧️ Notification sent to customer {} for order [{}]", order.customer_id, order.order_id);
        Ok(())
    }
}
