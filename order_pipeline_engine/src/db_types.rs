use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::Type;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind} value: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The business status of an order.
///
/// The happy path is the single forward chain `New → Processing → PaymentCompleted → Shipped → Delivered`. `Failed`
/// can be reached from any status that is not terminal. `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been recorded, but not yet validated.
    New,
    /// The order passed validation and is being worked on.
    Processing,
    /// Payment for the order was captured.
    PaymentCompleted,
    /// The order has been handed over for delivery.
    Shipped,
    /// The customer has received the order.
    Delivered,
    /// Processing stopped. The reason is kept in the order's `error_message`.
    Failed,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 6] = [
        OrderStatusType::New,
        OrderStatusType::Processing,
        OrderStatusType::PaymentCompleted,
        OrderStatusType::Shipped,
        OrderStatusType::Delivered,
        OrderStatusType::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::New => "NEW",
            OrderStatusType::Processing => "PROCESSING",
            OrderStatusType::PaymentCompleted => "PAYMENT_COMPLETED",
            OrderStatusType::Shipped => "SHIPPED",
            OrderStatusType::Delivered => "DELIVERED",
            OrderStatusType::Failed => "FAILED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PAYMENT_COMPLETED" => Ok(Self::PaymentCompleted),
            "SHIPPED" => Ok(Self::Shipped),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError::new("order status", s)),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to FAILED");
            OrderStatusType::Failed
        })
    }
}

//--------------------------------------     PaymentStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Completed => write!(f, "COMPLETED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            s => Err(ConversionError::new("payment status", s)),
        }
    }
}

//--------------------------------------       LineItem        ---------------------------------------------------------
/// A validated order line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl LineItem {
    pub fn new<S: Into<String>>(product_id: S, name: S, quantity: u32, price: f64) -> Self {
        Self { product_id: product_id.into(), name: name.into(), quantity, price }
    }

    pub fn subtotal(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }
}

//--------------------------------------    ShippingAddress    ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    /// The line items exactly as they were submitted. Orders are recorded before validation, so this may hold
    /// anything the producer sent. See [`crate::workflow::validate_order`] for the typed view.
    pub items: Value,
    pub total_amount: f64,
    pub shipping_address: Option<ShippingAddress>,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    /// The order id, generated by the pipeline. Producers never supply it.
    pub order_id: OrderId,
    pub customer_id: String,
    pub items: Value,
    pub total_amount: f64,
    pub shipping_address: Option<ShippingAddress>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, customer_id: String, items: Value, total_amount: f64) -> Self {
        Self { order_id, customer_id, items, total_amount, shipping_address: None, created_at: Utc::now() }
    }

    pub fn with_shipping_address(mut self, address: ShippingAddress) -> Self {
        self.shipping_address = Some(address);
        self
    }

    /// Builds a new order record from an unvalidated payload.
    ///
    /// This never fails. Missing or mistyped fields are recorded as empty values so that the attempt is still
    /// visible in storage; validation reports the actual problem afterwards.
    pub fn from_payload(order_id: OrderId, payload: &Value) -> Self {
        let customer_id = payload.get("customerId").and_then(Value::as_str).unwrap_or_default().to_string();
        let items = payload.get("items").cloned().unwrap_or(Value::Null);
        let total_amount = payload.get("totalAmount").and_then(Value::as_f64).unwrap_or_default();
        let shipping_address = payload
            .get("shippingAddress")
            .filter(|v| v.is_object())
            .and_then(|v| serde_json::from_value::<ShippingAddress>(v.clone()).ok());
        Self { order_id, customer_id, items, total_amount, shipping_address, created_at: Utc::now() }
    }
}

//--------------------------------------     MessageStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Processed,
    Failed,
}

impl Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Processed => write!(f, "PROCESSED"),
            MessageStatus::Failed => write!(f, "FAILED"),
        }
    }
}

//--------------------------------------     MessageRecord     ---------------------------------------------------------
pub const DEFAULT_MESSAGE_TYPE: &str = "TASK_MESSAGE";

/// The audit copy of one processing attempt of a queue message. Redeliveries produce one record per attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: i64,
    pub message_id: String,
    pub body: Value,
    pub message_type: String,
    pub status: MessageStatus,
    pub error: Option<String>,
    pub order_id: Option<OrderId>,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessageRecord {
    pub message_id: String,
    pub body: Value,
    pub message_type: String,
    pub status: MessageStatus,
    pub error: Option<String>,
    pub order_id: Option<OrderId>,
    pub processed_at: DateTime<Utc>,
}

impl NewMessageRecord {
    pub fn processed(message_id: &str, body: Value, message_type: &str) -> Self {
        Self {
            message_id: message_id.to_string(),
            body,
            message_type: message_type.to_string(),
            status: MessageStatus::Processed,
            error: None,
            order_id: None,
            processed_at: Utc::now(),
        }
    }

    pub fn failed(message_id: &str, body: Value, message_type: &str, error: String) -> Self {
        Self {
            message_id: message_id.to_string(),
            body,
            message_type: message_type.to_string(),
            status: MessageStatus::Failed,
            error: Some(error),
            order_id: None,
            processed_at: Utc::now(),
        }
    }

    pub fn with_order_id(mut self, order_id: Option<OrderId>) -> Self {
        self.order_id = order_id;
        self
    }
}

//--------------------------------------       RawRecord       ---------------------------------------------------------
/// An unstructured copy of an inbound queue message, written before any parsing is attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: i64,
    pub message_id: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRawRecord {
    pub message_id: String,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl NewRawRecord {
    pub fn new(message_id: &str, payload: Value) -> Self {
        Self { message_id: message_id.to_string(), payload, received_at: Utc::now() }
    }
}

//--------------------------------------     TriggerStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerStatus {
    Received,
    Processing,
    Completed,
    Failed,
}

impl Display for TriggerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerStatus::Received => write!(f, "RECEIVED"),
            TriggerStatus::Processing => write!(f, "PROCESSING"),
            TriggerStatus::Completed => write!(f, "COMPLETED"),
            TriggerStatus::Failed => write!(f, "FAILED"),
        }
    }
}

//--------------------------------------     TriggerRecord     ---------------------------------------------------------
/// Records one push-based invocation of the pipeline, independently of how the resulting order fared.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRecord {
    pub id: i64,
    pub message_id: String,
    pub event_source: String,
    pub event_time: DateTime<Utc>,
    pub body: Value,
    pub status: TriggerStatus,
    pub error: Option<String>,
    pub order_id: Option<OrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTriggerRecord {
    pub message_id: String,
    pub event_source: String,
    pub event_time: DateTime<Utc>,
    pub body: Value,
    pub status: TriggerStatus,
    pub error: Option<String>,
}

impl NewTriggerRecord {
    pub fn received(message_id: &str, event_source: &str, event_time: DateTime<Utc>, body: Value) -> Self {
        Self {
            message_id: message_id.to_string(),
            event_source: event_source.to_string(),
            event_time,
            body,
            status: TriggerStatus::Received,
            error: None,
        }
    }

    pub fn failed(message_id: &str, event_source: &str, body: Value, error: String) -> Self {
        Self {
            message_id: message_id.to_string(),
            event_source: event_source.to_string(),
            event_time: Utc::now(),
            body,
            status: TriggerStatus::Failed,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerUpdate {
    pub status: Option<TriggerStatus>,
    pub error: Option<String>,
    pub order_id: Option<OrderId>,
}

impl TriggerUpdate {
    pub fn status(status: TriggerStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_order_id(mut self, order_id: Option<OrderId>) -> Self {
        self.order_id = order_id;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.error.is_none() && self.order_id.is_none()
    }
}
