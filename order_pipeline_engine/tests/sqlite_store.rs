use order_pipeline_engine::{
    db_types::{
        MessageStatus,
        NewMessageRecord,
        NewOrder,
        NewRawRecord,
        NewTriggerRecord,
        OrderId,
        OrderStatusType,
        PaymentStatus,
        TriggerStatus,
        TriggerUpdate,
    },
    traits::OrderQueryFilter,
    AuditManagement,
    OrderManagement,
    StorageError,
    TriggerManagement,
};
use chrono::Utc;
use serde_json::json;

use crate::support::{prepare_db, tear_down};

mod support;

fn new_order(id: &str, customer: &str) -> NewOrder {
    NewOrder::new(OrderId::from(id), customer.to_string(), json!([{"productId": "P1"}]), 10.0)
}

#[tokio::test]
async fn orders_start_new_and_pending() {
    let db = prepare_db().await;
    let order = db.insert_order(new_order("ORD1", "alice")).await.unwrap();
    assert_eq!(order.status, OrderStatusType::New);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.shipping_address, None);
    assert_eq!(order.created_at, order.updated_at);
    let err = db.insert_order(new_order("ORD1", "bob")).await.unwrap_err();
    assert!(matches!(err, StorageError::OrderAlreadyExists(id) if id.as_str() == "ORD1"));
    tear_down(db).await;
}

#[tokio::test]
async fn updates_follow_the_state_machine_and_stop_at_terminal_states() {
    let db = prepare_db().await;
    let order = db.insert_order(new_order("ORD1", "alice")).await.unwrap();
    let processing = db.update_order(&order.apply(OrderStatusType::Processing, None).unwrap()).await.unwrap();
    assert_eq!(processing.status, OrderStatusType::Processing);
    assert!(processing.updated_at >= order.updated_at);
    let failed = processing.apply(OrderStatusType::Failed, Some("boom".into())).unwrap();
    let failed = db.update_order(&failed).await.unwrap();
    assert_eq!(failed.error_message.as_deref(), Some("boom"));
    // A stale in-memory copy cannot resurrect the order
    let stale = processing.apply(OrderStatusType::PaymentCompleted, None).unwrap();
    assert!(matches!(db.update_order(&stale).await, Err(StorageError::OrderNotUpdatable(_))));
    let mut ghost = stale.clone();
    ghost.order_id = OrderId::from("ORD-ghost");
    assert!(matches!(db.update_order(&ghost).await, Err(StorageError::OrderNotFound(_))));
    tear_down(db).await;
}

#[tokio::test]
async fn order_queries() {
    let db = prepare_db().await;
    for (id, customer) in [("ORD1", "alice"), ("ORD2", "bob"), ("ORD3", "alice"), ("ORD4", "carol")] {
        db.insert_order(new_order(id, customer)).await.unwrap();
    }
    let ord2 = db.fetch_order_by_order_id(&OrderId::from("ORD2")).await.unwrap().unwrap();
    db.update_order(&ord2.apply(OrderStatusType::Failed, Some("nope".into())).unwrap()).await.unwrap();

    let all = db.fetch_orders(OrderQueryFilter::default()).await.unwrap();
    assert_eq!(all.iter().map(|o| o.order_id.as_str()).collect::<Vec<_>>(), vec!["ORD1", "ORD2", "ORD3", "ORD4"]);
    let alice = db.fetch_orders(OrderQueryFilter::default().with_customer_id("alice")).await.unwrap();
    assert_eq!(alice.len(), 2);
    let open = db
        .fetch_orders(
            OrderQueryFilter::default().with_status(OrderStatusType::New).with_status(OrderStatusType::Processing),
        )
        .await
        .unwrap();
    assert_eq!(open.len(), 3);
    let failed_bob = db
        .fetch_orders(OrderQueryFilter::default().with_customer_id("bob").with_status(OrderStatusType::Failed))
        .await
        .unwrap();
    assert_eq!(failed_bob.len(), 1);
    let limited = db.fetch_orders(OrderQueryFilter::default().with_limit(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert!(db.fetch_order_by_order_id(&OrderId::from("ORD9")).await.unwrap().is_none());
    tear_down(db).await;
}

#[tokio::test]
async fn audit_records_are_append_only() {
    let db = prepare_db().await;
    let raw_id = db.insert_raw_record(NewRawRecord::new("m1", json!({"body": "{not json"}))).await.unwrap();
    assert!(raw_id > 0);
    db.insert_raw_record(NewRawRecord::new("m1", json!({"body": "{not json"}))).await.unwrap();
    let raw = db.fetch_raw_records("m1").await.unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].payload["body"], "{not json");

    let failed = NewMessageRecord::failed("m1", json!("{not json"), "TASK_MESSAGE", "Malformed message body".into());
    db.insert_message_record(failed).await.unwrap();
    let processed = NewMessageRecord::processed("m1", json!({"action": "processOrder"}), "NEW_ORDER")
        .with_order_id(Some(OrderId::from("ORD1")));
    let stored = db.insert_message_record(processed).await.unwrap();
    assert_eq!(stored.status, MessageStatus::Processed);
    assert_eq!(stored.order_id, Some(OrderId::from("ORD1")));
    let records = db.fetch_message_records("m1").await.unwrap();
    assert_eq!(records.iter().map(|r| r.status).collect::<Vec<_>>(), vec![
        MessageStatus::Failed,
        MessageStatus::Processed
    ]);
    assert_eq!(records[0].body, json!("{not json"));
    let recent = db.fetch_recent_message_records(1).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].message_type, "NEW_ORDER");
    tear_down(db).await;
}

#[tokio::test]
async fn trigger_lifecycle() {
    let db = prepare_db().await;
    let trigger = NewTriggerRecord::received("m1", "aws:sqs", Utc::now(), json!({"action": "processOrder"}));
    let trigger = db.insert_trigger(trigger).await.unwrap();
    assert_eq!(trigger.status, TriggerStatus::Received);
    let processing = db.update_trigger(trigger.id, TriggerUpdate::status(TriggerStatus::Processing)).await.unwrap();
    assert_eq!(processing.status, TriggerStatus::Processing);
    let done = TriggerUpdate::status(TriggerStatus::Completed).with_order_id(Some(OrderId::from("ORD1")));
    let done = db.update_trigger(trigger.id, done).await.unwrap();
    assert_eq!(done.order_id, Some(OrderId::from("ORD1")));
    assert_eq!(done.error, None);
    assert!(done.updated_at >= processing.updated_at);
    let unchanged = db.update_trigger(trigger.id, TriggerUpdate::default()).await.unwrap();
    assert_eq!(unchanged, done);
    assert!(matches!(
        db.update_trigger(9999, TriggerUpdate::status(TriggerStatus::Failed)).await,
        Err(StorageError::TriggerNotFound(9999))
    ));
    let all = db.fetch_triggers_for_message("m1").await.unwrap();
    assert_eq!(all.len(), 1);
    tear_down(db).await;
}
