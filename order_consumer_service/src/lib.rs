//! # Order consumer service
//! This crate hosts the long-running order consumer. It is responsible for:
//! * Reading its configuration from the environment.
//! * Connecting to the database and bringing the schema up to date.
//! * Connecting to the order queue.
//! * Running the consumer loop until it is asked to stop, and reporting the final totals.
//!
//! ## Configuration
//! The service is configured via environment variables. See [config](config/index.html) for more information.

pub mod cli;
pub mod config;
pub mod consumer_worker;
pub mod errors;
pub mod queue_backend;
pub mod service;
