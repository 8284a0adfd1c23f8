use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::lookup_host;

use crate::error::{Result, TransportError};

/// Largest payload a UDP datagram can carry over IPv4.
pub const MAX_UDP_PAYLOAD: usize = 65_507;

/// Default capacity of each event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default number of sends that may queue behind the IO task.
pub const DEFAULT_SEND_QUEUE: usize = 64;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Local address to bind. Default: `0.0.0.0:0` (wildcard, ephemeral port).
    pub local_addr: SocketAddr,
    /// Receive buffer size; longer datagrams are truncated by the OS.
    pub max_datagram_size: usize,
    /// Capacity of each broadcast channel. Slow subscribers lag past this.
    pub event_capacity: usize,
    /// Outbound datagrams that may wait for the socket.
    pub send_queue: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            max_datagram_size: MAX_UDP_PAYLOAD,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            send_queue: DEFAULT_SEND_QUEUE,
        }
    }
}

impl SessionConfig {
    /// Bind to a fixed local address, e.g. when a device only answers a known port.
    pub fn with_local_addr(mut self, addr: SocketAddr) -> Self {
        self.local_addr = addr;
        self
    }

    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn with_send_queue(mut self, depth: usize) -> Self {
        self.send_queue = depth;
        self
    }
}

/// Resolve a `host:port` string to the first matching socket address.
pub async fn resolve(target: &str) -> Result<SocketAddr> {
    let mut addrs = lookup_host(target)
        .await
        .map_err(|source| TransportError::Resolve {
            target: target.to_string(),
            source,
        })?;
    addrs.next().ok_or_else(|| TransportError::Resolve {
        target: target.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"),
    })
}
