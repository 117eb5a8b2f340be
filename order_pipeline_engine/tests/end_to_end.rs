use std::{collections::HashMap, time::Duration};

use order_pipeline_engine::{
    db_types::{MessageStatus, OrderStatusType, PaymentStatus},
    events::EventProducers,
    traits::OrderQueryFilter,
    AuditManagement,
    ConsumerConfig,
    MemoryQueue,
    OrderManagement,
    OrderMessageHandler,
    OrderProducer,
    OrderWorkflow,
    QueueClient,
    QueueConsumer,
    SimulatedServices,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::support::{prepare_db, tear_down};

mod support;

fn payload(action: &str, customer: &str) -> serde_json::Value {
    json!({
        "action": action,
        "customerId": customer,
        "items": [
            {"productId": "P1", "name": "Widget", "quantity": 2, "price": 10.0},
            {"productId": "P2", "name": "Gadget", "quantity": 1, "price": 5.5}
        ],
        "totalAmount": 25.5,
        "shippingAddress": {"street": "1 Main St", "city": "Springfield", "country": "US"}
    })
}

#[tokio::test]
async fn only_successful_messages_leave_the_queue() {
    let db = prepare_db().await;
    let queue = MemoryQueue::new(Duration::from_secs(60));
    let producer = OrderProducer::new(queue.clone());
    let results = producer.send_orders(&[payload("processOrder", "alice"), payload("cancelOrder", "bob")]).await;
    assert!(results.iter().all(|r| r.is_sent()));
    queue.send("{not json".to_string(), HashMap::new()).await.unwrap();
    assert_eq!(queue.len().await, 3);

    let workflow = OrderWorkflow::new(db.clone(), SimulatedServices::reliable(), EventProducers::default());
    let config = ConsumerConfig::default().with_wait_time(Duration::from_millis(50));
    let consumer = QueueConsumer::new(queue.clone(), db.clone(), OrderMessageHandler::new(workflow), config);
    let shutdown = CancellationToken::new();

    let watcher = async {
        for _ in 0..200 {
            if db.fetch_recent_message_records(10).await.unwrap().len() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        shutdown.cancel();
    };
    let (stats, _) = tokio::join!(consumer.run(shutdown.clone()), watcher);

    assert_eq!(stats.received, 3);
    assert_eq!(stats.acknowledged, 1);
    assert_eq!(stats.handler_failures, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(queue.len().await, 2);
    assert_eq!(queue.in_flight().await, 2);

    let orders = db.fetch_orders(OrderQueryFilter::default()).await.unwrap();
    assert_eq!(orders.len(), 2);
    let shipped = orders.iter().find(|o| o.customer_id == "alice").unwrap();
    assert_eq!(shipped.status, OrderStatusType::Shipped);
    assert_eq!(shipped.payment_status, PaymentStatus::Completed);
    let failed = orders.iter().find(|o| o.customer_id == "bob").unwrap();
    assert_eq!(failed.status, OrderStatusType::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("Invalid action"));

    let records = db.fetch_recent_message_records(10).await.unwrap();
    let processed = records.iter().filter(|r| r.status == MessageStatus::Processed).collect::<Vec<_>>();
    assert_eq!(processed.len(), 1);
    assert_eq!(processed[0].order_id.as_ref(), Some(&shipped.order_id));
    let raw = db.fetch_raw_records(&processed[0].message_id).await.unwrap();
    assert_eq!(raw.len(), 1);
    tear_down(db).await;
}

#[tokio::test]
async fn consumer_stops_while_waiting_for_messages() {
    let db = prepare_db().await;
    let queue = MemoryQueue::default();
    let workflow = OrderWorkflow::new(db.clone(), SimulatedServices::reliable(), EventProducers::default());
    let config = ConsumerConfig::default().with_wait_time(Duration::from_secs(20));
    let consumer = QueueConsumer::new(queue, db.clone(), OrderMessageHandler::new(workflow), config);
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });
    let stats = tokio::time::timeout(Duration::from_secs(5), consumer.run(shutdown)).await.unwrap();
    assert_eq!(stats.received, 0);
    assert_eq!(stats.polls, 0);
    tear_down(db).await;
}
