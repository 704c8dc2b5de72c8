//! Configuration for the relay TCP server.
//!
//! For now this is intentionally simple: you can either use defaults
//! or override via a few environment variables:
//!
//! - `RELAY_BIND_ADDR`   (default: "0.0.0.0")
//! - `RELAY_PORT`        (default: "12345")
//! - `RELAY_MAX_CLIENTS` (default: "1024")
//! - `RELAY_SEND_QUEUE`  (default: "256")

use std::env;
use std::str::FromStr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Capacity of each peer's outbound message queue. A peer that lets
    /// this many messages pile up unread is evicted.
    pub send_queue_capacity: usize,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let bind_addr = env::var("RELAY_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = read_env_or_default("RELAY_PORT", 12345u16)?;
        let max_clients = read_env_or_default("RELAY_MAX_CLIENTS", 1024usize)?;
        let send_queue_capacity = read_env_or_default("RELAY_SEND_QUEUE", 256usize)?;

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            send_queue_capacity,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> Result<T, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::error::Error + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
