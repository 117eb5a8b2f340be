//! Structural validation of inbound order payloads.
//!
//! Checks run in a fixed order and the first problem found is reported.
use serde_json::{Map, Value};

use crate::{
    db_types::{LineItem, ShippingAddress},
    workflow::FailureReason,
};

/// The only action the order workflow accepts.
pub const PROCESS_ORDER_ACTION: &str = "processOrder";
/// Largest accepted difference between `totalAmount` and the sum of the line item subtotals.
pub const TOTAL_TOLERANCE: f64 = 0.005;

/// The typed view of a payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedOrder {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    pub total_amount: f64,
    pub shipping_address: ShippingAddress,
}

fn invalid<S: Into<String>>(msg: S) -> FailureReason {
    FailureReason::Validation(msg.into())
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

fn validate_item(index: usize, item: &Value) -> Result<LineItem, FailureReason> {
    let obj = item.as_object().ok_or_else(|| invalid(format!("Item {index} must be an object")))?;
    let product_id =
        non_empty_str(obj, "productId").ok_or_else(|| invalid(format!("Item {index} is missing a productId")))?;
    let name = non_empty_str(obj, "name").ok_or_else(|| invalid(format!("Item {index} is missing a name")))?;
    let quantity = obj
        .get("quantity")
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid(format!("Item {index} quantity must be a number")))?;
    if quantity < 1.0 || quantity.fract() != 0.0 || quantity > f64::from(u32::MAX) {
        return Err(invalid(format!("Item {index} quantity must be a whole number of at least 1")));
    }
    let price =
        obj.get("price").and_then(Value::as_f64).ok_or_else(|| invalid(format!("Item {index} price must be a number")))?;
    if price < 0.0 {
        return Err(invalid(format!("Item {index} price must not be negative")));
    }
    Ok(LineItem::new(product_id, name, quantity as u32, price))
}

/// Validates a raw order payload.
///
/// The action is checked first. An unrecognised action yields [`FailureReason::InvalidAction`]; every other problem
/// is a [`FailureReason::Validation`] carrying a description of the first offending field.
pub fn validate_order(payload: &Value) -> Result<ValidatedOrder, FailureReason> {
    let obj = payload.as_object().ok_or_else(|| invalid("Order payload must be a JSON object"))?;
    if obj.get("action").and_then(Value::as_str) != Some(PROCESS_ORDER_ACTION) {
        return Err(FailureReason::InvalidAction);
    }
    let items = match obj.get("items").and_then(Value::as_array) {
        Some(items) if !items.is_empty() => items,
        _ => return Err(invalid("Order must contain at least one item")),
    };
    let items = items.iter().enumerate().map(|(i, item)| validate_item(i, item)).collect::<Result<Vec<_>, _>>()?;
    let customer_id = non_empty_str(obj, "customerId").ok_or_else(|| invalid("Customer ID is required"))?.to_string();
    let shipping_address = obj
        .get("shippingAddress")
        .filter(|v| v.is_object())
        .ok_or_else(|| invalid("Shipping address is required"))
        .and_then(|v| {
            serde_json::from_value::<ShippingAddress>(v.clone())
                .map_err(|e| invalid(format!("Shipping address is malformed. {e}")))
        })?;
    let total_amount = obj
        .get("totalAmount")
        .and_then(Value::as_f64)
        .filter(|t| *t >= 0.0)
        .ok_or_else(|| invalid("Total amount must be a non-negative number"))?;
    let expected: f64 = items.iter().map(LineItem::subtotal).sum();
    if (expected - total_amount).abs() > TOTAL_TOLERANCE {
        return Err(invalid(format!("Total amount {total_amount:.2} does not match the item total of {expected:.2}")));
    }
    Ok(ValidatedOrder { customer_id, items, total_amount, shipping_address })
}
