use std::{future::Future, pin::Pin};

use log::*;
#[cfg(feature = "sqs")]
use order_pipeline_engine::SqsQueue;
use order_pipeline_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    ConsumerStats,
    MemoryQueue,
    OrderMessageHandler,
    OrderWorkflow,
    QueueConsumer,
    SqliteDatabase,
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{QueueBackend, ServiceConfig},
    consumer_worker::{start_consumer_worker, ServiceConsumer},
    errors::ServiceStartupError,
    queue_backend::ServiceQueue,
};

const EVENT_BUFFER_SIZE: usize = 25;

/// Runs the consumer until Ctrl-C is pressed, then waits for the batch in progress and returns the final totals.
pub async fn run_service(config: ServiceConfig) -> Result<ConsumerStats, ServiceStartupError> {
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("🚀️ Shutdown requested. Finishing the current batch.");
                signal_token.cancel();
            },
            Err(e) => error!("🚀️ Could not listen for the shutdown signal. {e}"),
        }
    });
    run_until_cancelled(config, shutdown).await
}

/// Starts the service and runs it until `shutdown` is cancelled.
pub async fn run_until_cancelled(
    config: ServiceConfig,
    shutdown: CancellationToken,
) -> Result<ConsumerStats, ServiceStartupError> {
    config.validate()?;
    let db = connect_database(&config).await?;
    let queue = connect_queue(&config).await?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, logging_hooks());
    let producers = handlers.producers();
    handlers.start_handlers();
    let consumer = create_consumer(&config, db.clone(), queue, producers);
    let worker = start_consumer_worker(consumer, shutdown);
    let stats = worker.await.map_err(|e| ServiceStartupError::Worker(e.to_string()))?;
    info!("🚀️ Consumer stopped. {stats}");
    db.close().await;
    Ok(stats)
}

pub async fn connect_database(config: &ServiceConfig) -> Result<SqliteDatabase, ServiceStartupError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServiceStartupError::Database(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServiceStartupError::Migration(e.to_string()))?;
        info!("🚀️ Database migrations are up to date");
    } else {
        info!("🚀️ Skipping database migrations");
    }
    Ok(db)
}

pub async fn connect_queue(config: &ServiceConfig) -> Result<ServiceQueue, ServiceStartupError> {
    match config.queue.backend {
        #[cfg(feature = "sqs")]
        QueueBackend::Sqs => {
            let sqs_config = config.queue.sqs_config()?;
            let queue = SqsQueue::connect(&sqs_config).await;
            let waiting = queue.check_connection().await?;
            info!("🚀️ Using SQS queue {} with about {waiting} message(s) waiting", sqs_config.queue_url);
            Ok(ServiceQueue::Sqs(queue))
        },
        #[cfg(not(feature = "sqs"))]
        QueueBackend::Sqs => Err(crate::errors::ConfigError::SqsNotEnabled.into()),
        QueueBackend::Memory => {
            warn!("🚀️ Using the in-memory queue. Messages do not survive a restart.");
            Ok(ServiceQueue::Memory(MemoryQueue::default()))
        },
    }
}

pub fn create_consumer(
    config: &ServiceConfig,
    db: SqliteDatabase,
    queue: ServiceQueue,
    producers: EventProducers,
) -> ServiceConsumer {
    let workflow = OrderWorkflow::new(db.clone(), config.simulation.services(), producers);
    let handler = OrderMessageHandler::new(workflow);
    QueueConsumer::new(queue, db, handler, config.consumer.clone())
}

fn logging_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_shipped(|ev| {
            Box::pin(async move {
                info!("📬️ Order {} shipped. Transaction {}", ev.order.order_id, ev.transaction_id);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_order_failed(|ev| {
            Box::pin(async move {
                info!("📬️ Order {} failed. {}", ev.order.order_id, ev.reason);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    hooks
}
