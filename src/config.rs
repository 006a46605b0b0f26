//! Static configuration.
//!
//! Options are read once at startup from environment variables, falling back
//! to defaults that match a small local cluster.

use std::time::Duration;

/// Runtime options shared by every role.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port peers listen on.
    pub port: u16,
    /// Desired replica count per key.
    pub replication_factor: usize,
    /// Advisory initial ring size.
    pub default_ring_size: usize,
    /// Bound on every network operation, in milliseconds.
    pub network_timeout_ms: u64,
    /// Directory holding the persisted tables.
    pub data_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("RINGSTORE_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);
        let replication_factor = std::env::var("REPLICATION_FACTOR")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(2);
        let default_ring_size = std::env::var("DEFAULT_RING_SIZE")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(3);
        let network_timeout_ms = std::env::var("NETWORK_TIMEOUT_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(3000);
        let data_dir =
            std::env::var("RINGSTORE_DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        Self {
            port,
            replication_factor,
            default_ring_size,
            network_timeout_ms,
            data_dir,
        }
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            replication_factor: 2,
            default_ring_size: 3,
            network_timeout_ms: 3000,
            data_dir: "./data".to_string(),
        }
    }
}
