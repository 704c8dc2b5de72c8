//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Listens on the configured address/port.
//! - Spawns the single central hub task that owns the roster.
//! - Accepts new TCP connections and spawns a per-connection task.
//!
//! The actual per-connection logic and hub loop live in `conn` and `hub`
//! modules respectively. The accept path knows nothing about identities;
//! those are assigned by the hub at registration.

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::conn;
use crate::hub;

/// Run the TCP server with the given configuration.
///
/// A bind failure surfaces here as an error for the caller to report;
/// everything after that is contained per connection.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    let hub = hub::start();

    loop {
        let (stream, peer_addr) = listener.accept().await?;

        let connected = hub.peer_count().await.unwrap_or(0);
        if connected >= config.max_clients {
            warn!(
                %peer_addr,
                max_clients = config.max_clients,
                "rejecting connection: at capacity"
            );
            // Just drop the stream; the client sees the connection closed.
            continue;
        }

        info!(%peer_addr, "accepted connection");

        let hub = hub.clone();
        let queue_capacity = config.send_queue_capacity;

        tokio::spawn(async move {
            if let Err(e) = conn::run_connection(stream, hub, queue_capacity).await {
                warn!(%peer_addr, error = %e, "connection ended with error");
            } else {
                info!(%peer_addr, "connection closed");
            }
        });
    }
}
