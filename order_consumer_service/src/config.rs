use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use opl_common::{parse_boolean_flag, parse_bounded, Secret};
#[cfg(feature = "sqs")]
use order_pipeline_engine::SqsConfig;
use order_pipeline_engine::{
    consumer::{DEFAULT_ERROR_BACKOFF, DEFAULT_WAIT_TIME},
    queue::MAX_BATCH_SIZE,
    workflow::{DEFAULT_INVENTORY_FAILURE_RATE, DEFAULT_PAYMENT_FAILURE_RATE},
    ConsumerConfig,
    SimulatedServices,
};

use crate::errors::ConfigError;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/order_pipeline.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_AWS_REGION: &str = "us-east-1";
const MAX_WAIT_TIME_SECONDS: u64 = 20;
const MAX_CONCURRENCY: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueueBackend {
    #[default]
    Sqs,
    Memory,
}

impl FromStr for QueueBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqs" => Ok(Self::Sqs),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::UnknownQueueBackend(other.to_string())),
        }
    }
}

impl Display for QueueBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqs => write!(f, "sqs"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub backend: QueueBackend,
    /// Required for the SQS backend.
    pub queue_url: Option<String>,
    pub region: String,
    /// Overrides the SQS endpoint, e.g. for a local emulator.
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Secret<String>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: QueueBackend::default(),
            queue_url: None,
            region: DEFAULT_AWS_REGION.to_string(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: Secret::default(),
        }
    }
}

impl QueueConfig {
    #[cfg(feature = "sqs")]
    pub fn sqs_config(&self) -> Result<SqsConfig, ConfigError> {
        let queue_url = self.queue_url.clone().ok_or(ConfigError::MissingQueueUrl)?;
        Ok(SqsConfig {
            queue_url,
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
        })
    }
}

/// Failure rates and latency of the simulated fulfilment services.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub inventory_failure_rate: f64,
    pub payment_failure_rate: f64,
    pub latency: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            inventory_failure_rate: DEFAULT_INVENTORY_FAILURE_RATE,
            payment_failure_rate: DEFAULT_PAYMENT_FAILURE_RATE,
            latency: Duration::ZERO,
        }
    }
}

impl SimulationConfig {
    pub fn services(&self) -> SimulatedServices {
        SimulatedServices::new(self.inventory_failure_rate, self.payment_failure_rate, self.latency)
    }
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub run_migrations: bool,
    pub queue: QueueConfig,
    pub consumer: ConsumerConfig,
    pub simulation: SimulationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            run_migrations: true,
            queue: QueueConfig::default(),
            consumer: ConsumerConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Reads the configuration from `OPL_*` environment variables. Invalid values are reported and replaced by their
    /// defaults.
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let database_url = lookup("OPL_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ OPL_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections =
            bounded_or_default(&lookup, "OPL_DB_MAX_CONNECTIONS", 1, 100, DEFAULT_DB_MAX_CONNECTIONS);
        let run_migrations = parse_boolean_flag(lookup("OPL_RUN_MIGRATIONS"), true);
        let queue = queue_config(&lookup);
        let consumer = consumer_config(&lookup);
        let simulation = simulation_config(&lookup);
        Self { database_url, db_max_connections, run_migrations, queue, consumer, simulation }
    }

    /// Checks the settings that have no sensible default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.queue.backend {
            QueueBackend::Sqs if self.queue.queue_url.is_none() => Err(ConfigError::MissingQueueUrl),
            QueueBackend::Sqs if cfg!(not(feature = "sqs")) => Err(ConfigError::SqsNotEnabled),
            _ => Ok(()),
        }
    }
}

fn queue_config<F>(lookup: &F) -> QueueConfig
where F: Fn(&str) -> Option<String> {
    let backend = match lookup("OPL_QUEUE_BACKEND") {
        Some(s) => s.parse::<QueueBackend>().unwrap_or_else(|e| {
            warn!("🪛️ {e} [OPL_QUEUE_BACKEND]. Using the default, {}, instead.", QueueBackend::default());
            QueueBackend::default()
        }),
        None => QueueBackend::default(),
    };
    let non_empty = |name: &str| lookup(name).map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    let queue_url = non_empty("OPL_SQS_QUEUE_URL");
    if backend == QueueBackend::Sqs && queue_url.is_none() {
        error!("🪛️ OPL_SQS_QUEUE_URL is not set. Please set it to the URL of the order queue.");
    }
    let region = non_empty("OPL_AWS_REGION").unwrap_or_else(|| DEFAULT_AWS_REGION.to_string());
    let endpoint = non_empty("OPL_SQS_ENDPOINT");
    let access_key_id = non_empty("OPL_AWS_ACCESS_KEY_ID");
    let secret_access_key = Secret::new(non_empty("OPL_AWS_SECRET_ACCESS_KEY").unwrap_or_default());
    if access_key_id.is_some() != !secret_access_key.is_empty() {
        warn!(
            "🪛️ Only one of OPL_AWS_ACCESS_KEY_ID and OPL_AWS_SECRET_ACCESS_KEY is set. Static credentials need both, \
             so the default AWS provider chain will be used."
        );
    }
    QueueConfig { backend, queue_url, region, endpoint, access_key_id, secret_access_key }
}

fn consumer_config<F>(lookup: &F) -> ConsumerConfig
where F: Fn(&str) -> Option<String> {
    let max_messages = bounded_or_default(lookup, "OPL_MAX_MESSAGES", 1, MAX_BATCH_SIZE, MAX_BATCH_SIZE);
    let wait_time =
        bounded_or_default(lookup, "OPL_WAIT_TIME_SECONDS", 0, MAX_WAIT_TIME_SECONDS, DEFAULT_WAIT_TIME.as_secs());
    let error_backoff =
        bounded_or_default(lookup, "OPL_ERROR_BACKOFF_SECS", 0, 3600, DEFAULT_ERROR_BACKOFF.as_secs());
    let concurrency = bounded_or_default(lookup, "OPL_CONCURRENCY", 1, MAX_CONCURRENCY, 1);
    ConsumerConfig::default()
        .with_max_messages(max_messages)
        .with_wait_time(Duration::from_secs(wait_time))
        .with_error_backoff(Duration::from_secs(error_backoff))
        .with_concurrency(concurrency)
}

fn simulation_config<F>(lookup: &F) -> SimulationConfig
where F: Fn(&str) -> Option<String> {
    let inventory_failure_rate =
        bounded_or_default(lookup, "OPL_INVENTORY_FAILURE_RATE", 0.0, 1.0, DEFAULT_INVENTORY_FAILURE_RATE);
    let payment_failure_rate =
        bounded_or_default(lookup, "OPL_PAYMENT_FAILURE_RATE", 0.0, 1.0, DEFAULT_PAYMENT_FAILURE_RATE);
    let latency_ms = bounded_or_default(lookup, "OPL_SIMULATED_LATENCY_MS", 0, 60_000, 0u64);
    SimulationConfig { inventory_failure_rate, payment_failure_rate, latency: Duration::from_millis(latency_ms) }
}

fn bounded_or_default<F, T>(lookup: &F, name: &str, min: T, max: T, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Display + Copy,
    T::Err: Display,
{
    match lookup(name) {
        Some(s) => parse_bounded(&s, min, max).unwrap_or_else(|e| {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default, {default}, instead.");
            default
        }),
        None => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}
