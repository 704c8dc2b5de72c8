//! Line-based TCP server for the chat relay.

use relay_server::config::Config;
use relay_server::server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = Config::from_env()?;

    info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        send_queue = config.send_queue_capacity,
        "starting relay-server"
    );

    server::run(config).await
}
