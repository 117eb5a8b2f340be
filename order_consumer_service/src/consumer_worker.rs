use log::*;
use order_pipeline_engine::{ConsumerStats, OrderMessageHandler, QueueConsumer, SimulatedServices, SqliteDatabase};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::queue_backend::ServiceQueue;

pub type ServiceConsumer =
    QueueConsumer<ServiceQueue, SqliteDatabase, OrderMessageHandler<SqliteDatabase, SimulatedServices>>;

/// Starts the consumer worker. The returned handle resolves to the final totals once `shutdown` is cancelled and the
/// batch in progress has been finished.
pub fn start_consumer_worker(consumer: ServiceConsumer, shutdown: CancellationToken) -> JoinHandle<ConsumerStats> {
    tokio::spawn(async move {
        info!("🕰️ Consumer worker started with {:?}", consumer.config());
        let stats = consumer.run(shutdown).await;
        info!("🕰️ Consumer worker finished");
        stats
    })
}
