use order_pipeline_engine::{
    consumer::OrderMessageHandler,
    db_types::{OrderStatusType, TriggerStatus},
    events::EventProducers,
    trigger::{InvocationEvent, TriggerProcessor},
    OrderManagement,
    OrderWorkflow,
    SimulatedServices,
    TriggerManagement,
};
use serde_json::json;

use crate::support::{prepare_db, tear_down, Call, CallLog, FlakyTriggers, RecordingHandler};

mod support;

fn record(message_id: &str, sent: &str, body: &str) -> serde_json::Value {
    json!({
        "messageId": message_id,
        "receiptHandle": format!("handle-{message_id}"),
        "body": body,
        "attributes": {"ApproximateReceiveCount": "1", "SentTimestamp": sent},
        "messageAttributes": {},
        "eventSource": "aws:sqs"
    })
}

fn order_body(action: &str) -> String {
    json!({
        "action": action,
        "customerId": "C7",
        "items": [{"productId": "P1", "name": "Widget", "quantity": 1, "price": 12.5}],
        "totalAmount": 12.5,
        "shippingAddress": {"city": "Cape Town", "country": "ZA"}
    })
    .to_string()
}

#[tokio::test]
async fn every_record_gets_a_trigger() {
    let db = prepare_db().await;
    let workflow = OrderWorkflow::new(db.clone(), SimulatedServices::reliable(), EventProducers::default());
    let processor = TriggerProcessor::new(db.clone(), OrderMessageHandler::new(workflow));
    let event: InvocationEvent = serde_json::from_value(json!({
        "Records": [
            record("ok", "1729339200000", &order_body("processOrder")),
            record("cancel", "1729339200001", &order_body("cancelOrder")),
            record("late", "the day before yesterday", &order_body("processOrder")),
            record("garbled", "1729339200002", "{not json"),
        ]
    }))
    .unwrap();

    let report = processor.process_event(event).await;
    assert_eq!(report.processed, vec!["ok".to_string()]);
    assert_eq!(report.failed, vec!["cancel".to_string(), "late".to_string(), "garbled".to_string()]);

    let ok = db.fetch_triggers_for_message("ok").await.unwrap();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].status, TriggerStatus::Completed);
    assert_eq!(ok[0].event_source, "aws:sqs");
    assert_eq!(ok[0].event_time.timestamp_millis(), 1_729_339_200_000);
    assert!(ok[0].updated_at >= ok[0].created_at);
    let order_id = ok[0].order_id.clone().unwrap();
    let order = db.fetch_order_by_order_id(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Shipped);

    let cancel = db.fetch_triggers_for_message("cancel").await.unwrap();
    assert_eq!(cancel.len(), 1);
    assert_eq!(cancel[0].status, TriggerStatus::Failed);
    assert_eq!(cancel[0].error.as_deref(), Some("Invalid action"));
    let failed_order = db.fetch_order_by_order_id(cancel[0].order_id.as_ref().unwrap()).await.unwrap().unwrap();
    assert_eq!(failed_order.error_message.as_deref(), Some("Invalid action"));

    let late = db.fetch_triggers_for_message("late").await.unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].status, TriggerStatus::Failed);
    assert_eq!(late[0].error.as_deref(), Some("Invalid eventTime: the day before yesterday"));
    assert_eq!(late[0].body["action"], "processOrder");

    let garbled = db.fetch_triggers_for_message("garbled").await.unwrap();
    assert_eq!(garbled[0].status, TriggerStatus::Failed);
    assert_eq!(garbled[0].body, json!("{not json"));
    assert!(garbled[0].error.as_deref().unwrap().starts_with("Malformed message body"));

    assert_eq!(report.batch_item_failures()["batchItemFailures"].as_array().unwrap().len(), 3);
    tear_down(db).await;
}

#[tokio::test]
async fn empty_invocations_are_fine() {
    let db = prepare_db().await;
    let workflow = OrderWorkflow::new(db.clone(), SimulatedServices::reliable(), EventProducers::default());
    let processor = TriggerProcessor::new(db.clone(), OrderMessageHandler::new(workflow));
    let report = processor.process_event(InvocationEvent::default()).await;
    assert!(report.all_succeeded());
    assert!(report.processed.is_empty());
    tear_down(db).await;
}

fn single_record_event(body: &str) -> InvocationEvent {
    serde_json::from_value(json!({ "Records": [record("m1", "1729339200000", body)] })).unwrap()
}

fn handled(log: &CallLog) -> usize {
    log.count(|c| matches!(c, Call::Handle(_)))
}

#[tokio::test]
async fn unrecorded_processing_fails_the_trigger_before_handling() {
    let _ = env_logger::try_init();
    let log = CallLog::default();
    let triggers = FlakyTriggers::default().failing_update_to(TriggerStatus::Processing);
    let processor = TriggerProcessor::new(triggers.clone(), RecordingHandler::new(log.clone()));
    let report = processor.process_event(single_record_event(r#"{"id": "m1"}"#)).await;
    assert_eq!(report.failed, vec!["m1".to_string()]);
    assert_eq!(report.batch_item_failures(), json!({"batchItemFailures": [{"itemIdentifier": "m1"}]}));
    assert_eq!(handled(&log), 0);
    let stored = triggers.triggers();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, TriggerStatus::Failed);
    assert!(stored[0].error.as_deref().unwrap().ends_with("trigger updates are unavailable"));
}

#[tokio::test]
async fn unrecorded_completion_still_counts_as_processed() {
    let _ = env_logger::try_init();
    let log = CallLog::default();
    let triggers = FlakyTriggers::default().failing_update_to(TriggerStatus::Completed);
    let processor = TriggerProcessor::new(triggers.clone(), RecordingHandler::new(log.clone()));
    let report = processor.process_event(single_record_event(r#"{"id": "m1"}"#)).await;
    assert_eq!(report.processed, vec!["m1".to_string()]);
    assert!(report.all_succeeded());
    assert_eq!(report.batch_item_failures(), json!({"batchItemFailures": []}));
    assert_eq!(handled(&log), 1);
    let stored = triggers.triggers();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, TriggerStatus::Failed);
    assert_eq!(stored[0].order_id.as_ref().map(|o| o.as_str()), Some("ORD-m1"));
    assert!(stored[0].error.as_deref().unwrap().starts_with("Handled, but the completion could not be recorded."));
}

#[tokio::test]
async fn a_failure_is_stored_even_when_the_trigger_cannot_be_updated() {
    let _ = env_logger::try_init();
    let log = CallLog::default();
    let triggers =
        FlakyTriggers::default().failing_update_to(TriggerStatus::Processing).failing_update_to(TriggerStatus::Failed);
    let processor = TriggerProcessor::new(triggers.clone(), RecordingHandler::new(log.clone()));
    let report = processor.process_event(single_record_event(r#"{"id": "m1"}"#)).await;
    assert_eq!(report.failed, vec!["m1".to_string()]);
    assert_eq!(handled(&log), 0);
    let statuses = triggers.triggers().iter().map(|t| t.status).collect::<Vec<_>>();
    assert_eq!(statuses, vec![TriggerStatus::Received, TriggerStatus::Failed]);
    assert!(triggers.triggers()[1].error.as_deref().unwrap().ends_with("trigger updates are unavailable"));
}

#[tokio::test]
async fn unrecorded_arrival_stores_a_standalone_failure() {
    let _ = env_logger::try_init();
    let log = CallLog::default();
    let triggers = FlakyTriggers::default().failing_insert_of(TriggerStatus::Received);
    let processor = TriggerProcessor::new(triggers.clone(), RecordingHandler::new(log.clone()));
    let report = processor.process_event(single_record_event(r#"{"id": "m1"}"#)).await;
    assert_eq!(report.failed, vec!["m1".to_string()]);
    assert_eq!(report.batch_item_failures()["batchItemFailures"][0]["itemIdentifier"], "m1");
    assert_eq!(handled(&log), 0);
    let stored = triggers.triggers();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, TriggerStatus::Failed);
    assert_eq!(stored[0].body, json!({"id": "m1"}));
    assert!(stored[0].error.as_deref().unwrap().ends_with("cannot insert RECEIVED triggers"));
}

#[tokio::test]
async fn handler_failures_are_recorded_on_the_trigger() {
    let _ = env_logger::try_init();
    let log = CallLog::default();
    let triggers = FlakyTriggers::default();
    let processor = TriggerProcessor::new(triggers.clone(), RecordingHandler::new(log.clone()));
    let report = processor.process_event(single_record_event(r#"{"id": "m1", "fail": true}"#)).await;
    assert_eq!(report.failed, vec!["m1".to_string()]);
    let stored = triggers.fetch_triggers_for_message("m1").await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, TriggerStatus::Failed);
    assert_eq!(stored[0].error.as_deref(), Some("Handler refused m1"));
    assert_eq!(stored[0].order_id.as_ref().map(|o| o.as_str()), Some("ORD-m1"));
}
