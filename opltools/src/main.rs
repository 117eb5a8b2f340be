use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenvy::dotenv;
use order_consumer_service::config::ServiceConfig;
use order_pipeline_engine::db_types::OrderStatusType;

mod commands;
mod formatting;
mod samples;

#[derive(Parser, Debug)]
#[command(version = "0.1.0", about = "Operator tools for the order pipeline")]
pub struct Arguments {
    /// Overrides OPL_DATABASE_URL
    #[arg(short, long, global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "send", about = "Send one order to the configured queue")]
    Send(SendParams),
    #[clap(name = "send-batch", about = "Send several orders, in chunks of at most 10")]
    SendBatch(SendBatchParams),
    #[clap(name = "invoke", about = "Replay a push-invocation event file through the trigger processor")]
    Invoke(InvokeParams),
    #[clap(name = "orders", about = "List stored orders")]
    Orders(OrdersParams),
    #[clap(name = "messages", about = "List inbound message records")]
    Messages(MessagesParams),
}

#[derive(Debug, Args)]
pub struct SendParams {
    /// A JSON file holding the order payload. A sample order is sent when omitted.
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct SendBatchParams {
    /// A JSON file holding an array of order payloads
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// The number of sample orders to generate when no file is given
    #[arg(short, long, default_value = "3")]
    pub count: usize,
}

#[derive(Debug, Args)]
pub struct InvokeParams {
    /// A JSON file holding a `{"Records": [...]}` event
    pub event_file: PathBuf,
}

#[derive(Debug, Args)]
pub struct OrdersParams {
    #[arg(short, long)]
    pub customer_id: Option<String>,
    /// Only list orders in these statuses, e.g. `-s SHIPPED -s FAILED`
    #[arg(short, long = "status")]
    pub statuses: Vec<OrderStatusType>,
    #[arg(short, long)]
    pub limit: Option<i64>,
    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct MessagesParams {
    /// Show every attempt for this message id instead of the most recent records
    #[arg(short, long)]
    pub message_id: Option<String>,
    #[arg(short, long, default_value = "20")]
    pub limit: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let mut config = ServiceConfig::from_env_or_default();
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    match cli.command {
        Command::Send(params) => commands::send_order(&config, params).await,
        Command::SendBatch(params) => commands::send_batch(&config, params).await,
        Command::Invoke(params) => commands::invoke(&config, params).await,
        Command::Orders(params) => commands::list_orders(&config, params).await,
        Command::Messages(params) => commands::list_messages(&config, params).await,
    }
}
