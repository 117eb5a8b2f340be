use dotenvy::dotenv;
use log::info;
use order_consumer_service::{cli::handle_command_line_args, config::ServiceConfig, service::run_service};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    if handle_command_line_args() {
        return;
    }
    let config = ServiceConfig::from_env_or_default();

    info!("🚀️ Starting the order consumer with the {} queue backend", config.queue.backend);
    match run_service(config).await {
        Ok(stats) => println!("Bye! {stats}"),
        Err(e) => eprintln!("{e}"),
    }
}
