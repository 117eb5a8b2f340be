use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::StorageError,
};

/// The `OrderManagement` trait defines the behaviour for persisting and querying orders in the storage backend.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Stores a brand-new order in `New` status with a `Pending` payment and returns the stored record.
    ///
    /// If an order with the same order id already exists, `StorageError::OrderAlreadyExists` is returned.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StorageError>;

    /// Persists the mutable fields of `order` (status, payment status, error message and `updated_at`).
    ///
    /// Backends must refuse to overwrite an order whose *stored* status is terminal, returning
    /// `StorageError::OrderNotUpdatable`. An unknown order id results in `StorageError::OrderNotFound`.
    async fn update_order(&self, order: &Order) -> Result<Order, StorageError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, StorageError>;

    /// Fetches orders matching the filter, oldest first.
    async fn fetch_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub statuses: Vec<OrderStatusType>,
    pub limit: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none() && self.statuses.is_empty()
    }
}
