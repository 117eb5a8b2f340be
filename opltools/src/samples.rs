use serde_json::{json, Value};

pub fn sample_order() -> Value {
    json!({
        "action": "processOrder",
        "customerId": "CUST001",
        "items": [{"productId": "P1", "name": "iPhone", "quantity": 1, "price": 999.99}],
        "totalAmount": 999.99,
        "shippingAddress": {
            "street": "123 Main St",
            "city": "New York",
            "state": "NY",
            "zipCode": "10001",
            "country": "USA"
        }
    })
}

/// `count` distinct sample orders, one item each.
pub fn sample_orders(count: usize) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let n = i + 2;
            json!({
                "action": "processOrder",
                "customerId": format!("CUST{n:03}"),
                "items": [{"productId": format!("P{n}"), "name": format!("Product {n}"), "quantity": 1, "price": 99.99}],
                "totalAmount": 99.99,
                "shippingAddress": {
                    "street": format!("{n}00 Test St"),
                    "city": "Test City",
                    "state": "TS",
                    "zipCode": "12345",
                    "country": "USA"
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use order_pipeline_engine::workflow::validate_order;

    use super::*;

    #[test]
    fn samples_are_valid_orders() {
        assert!(validate_order(&sample_order()).is_ok());
        let orders = sample_orders(12);
        assert_eq!(orders.len(), 12);
        assert_eq!(orders[0]["customerId"], "CUST002");
        assert_eq!(orders[11]["customerId"], "CUST013");
        assert!(orders.iter().all(|o| validate_order(o).is_ok()));
    }
}
