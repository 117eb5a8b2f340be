use std::{fs, path::Path};

use anyhow::{anyhow, bail, Result};
use log::*;
use order_consumer_service::{
    config::{QueueBackend, ServiceConfig},
    queue_backend::ServiceQueue,
    service::{connect_database, connect_queue},
};
use order_pipeline_engine::{
    events::EventProducers,
    traits::OrderQueryFilter,
    trigger::InvocationEvent,
    AuditManagement,
    OrderManagement,
    OrderMessageHandler,
    OrderProducer,
    OrderWorkflow,
    TriggerManagement,
    TriggerProcessor,
};
use serde_json::Value;

use crate::{
    formatting::{format_batch_results, format_message_records, format_orders, format_report, format_triggers},
    samples::{sample_order, sample_orders},
    InvokeParams,
    MessagesParams,
    OrdersParams,
    SendBatchParams,
    SendParams,
};

fn read_json(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path).map_err(|e| anyhow!("Could not read {}. {e}", path.display()))?;
    serde_json::from_str(&contents).map_err(|e| anyhow!("{} does not contain valid JSON. {e}", path.display()))
}

async fn open_queue(config: &ServiceConfig) -> Result<ServiceQueue> {
    if config.queue.backend == QueueBackend::Memory {
        bail!("The memory queue only lives inside one process. Set OPL_QUEUE_BACKEND=sqs to send orders.");
    }
    config.validate()?;
    Ok(connect_queue(config).await?)
}

pub async fn send_order(config: &ServiceConfig, params: SendParams) -> Result<()> {
    let payload = match params.file {
        Some(path) => read_json(&path)?,
        None => sample_order(),
    };
    let producer = OrderProducer::new(open_queue(config).await?);
    let message_id = producer.send_order(&payload).await?;
    println!("Order sent with message id {message_id}");
    Ok(())
}

pub async fn send_batch(config: &ServiceConfig, params: SendBatchParams) -> Result<()> {
    let payloads = match params.file {
        Some(path) => match read_json(&path)? {
            Value::Array(payloads) => payloads,
            _ => bail!("{} must contain a JSON array of orders", path.display()),
        },
        None => sample_orders(params.count),
    };
    if payloads.is_empty() {
        bail!("There are no orders to send");
    }
    let producer = OrderProducer::new(open_queue(config).await?);
    let results = producer.send_orders(&payloads).await;
    println!("{}", format_batch_results(&results));
    Ok(())
}

pub async fn invoke(config: &ServiceConfig, params: InvokeParams) -> Result<()> {
    let event: InvocationEvent = serde_json::from_value(read_json(&params.event_file)?)
        .map_err(|e| anyhow!("{} is not a valid invocation event. {e}", params.event_file.display()))?;
    let db = connect_database(config).await?;
    let workflow = OrderWorkflow::new(db.clone(), config.simulation.services(), EventProducers::default());
    let processor = TriggerProcessor::new(db.clone(), OrderMessageHandler::new(workflow));
    let message_ids = event.records.iter().map(|r| r.message_id.clone()).collect::<Vec<_>>();
    let report = processor.process_event(event).await;
    println!("{}", format_report(&report));
    let mut triggers = Vec::new();
    for message_id in &message_ids {
        triggers.extend(db.fetch_triggers_for_message(message_id).await?);
    }
    println!("{}", format_triggers(&triggers));
    if !report.all_succeeded() {
        println!("{}", serde_json::to_string_pretty(&report.batch_item_failures())?);
    }
    db.close().await;
    Ok(())
}

pub async fn list_orders(config: &ServiceConfig, params: OrdersParams) -> Result<()> {
    let db = connect_database(config).await?;
    let mut filter = OrderQueryFilter::default();
    if let Some(customer_id) = params.customer_id {
        filter = filter.with_customer_id(customer_id);
    }
    for status in params.statuses {
        filter = filter.with_status(status);
    }
    if let Some(limit) = params.limit {
        filter = filter.with_limit(limit);
    }
    debug!("Fetching orders with {filter:?}");
    let orders = db.fetch_orders(filter).await?;
    if params.json {
        println!("{}", serde_json::to_string_pretty(&orders)?);
    } else {
        println!("{}", format_orders(&orders));
    }
    db.close().await;
    Ok(())
}

pub async fn list_messages(config: &ServiceConfig, params: MessagesParams) -> Result<()> {
    let db = connect_database(config).await?;
    match params.message_id {
        Some(message_id) => {
            let records = db.fetch_message_records(&message_id).await?;
            let raw = db.fetch_raw_records(&message_id).await?;
            println!("{}", format_message_records(&records));
            println!("{} raw cop{} stored for {message_id}", raw.len(), if raw.len() == 1 { "y" } else { "ies" });
        },
        None => {
            let records = db.fetch_recent_message_records(params.limit).await?;
            println!("{}", format_message_records(&records));
        },
    }
    db.close().await;
    Ok(())
}
