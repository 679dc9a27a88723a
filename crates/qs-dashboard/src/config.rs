//! Dashboard configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// `[dashboard]` section. Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Serve the API at all. Off unless configured.
    pub enabled: bool,
    pub bind_address: IpAddr,
    pub port: u16,
    /// Period of the WebSocket update push.
    pub update_interval_ms: u64,
    /// Concurrent WebSocket clients; further upgrades get 503.
    pub max_connections: usize,
    /// Updates buffered per client before it starts lagging.
    pub broadcast_capacity: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            update_interval_ms: 1000,
            max_connections: 10,
            broadcast_capacity: 32,
        }
    }
}

impl DashboardConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}
