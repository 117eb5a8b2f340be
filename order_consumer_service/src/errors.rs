use order_pipeline_engine::queue::QueueError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("OPL_SQS_QUEUE_URL must be set when the SQS queue backend is used")]
    MissingQueueUrl,
    #[error("'{0}' is not a known queue backend. Use 'sqs' or 'memory'")]
    UnknownQueueBackend(String),
    #[error("The SQS queue backend was requested, but this build does not include SQS support")]
    SqsNotEnabled,
}

#[derive(Debug, Error)]
pub enum ServiceStartupError {
    #[error("Invalid service configuration. {0}")]
    Configuration(#[from] ConfigError),
    #[error("Could not connect to the database. {0}")]
    Database(String),
    #[error("Could not run the database migrations. {0}")]
    Migration(String),
    #[error("Could not set up the order queue. {0}")]
    Queue(#[from] QueueError),
    #[error("The consumer worker did not shut down cleanly. {0}")]
    Worker(String),
}
