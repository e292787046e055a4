//! Configuration structures consumed by the log shipper.
//!
//! `ShipperBuilder` constructs these values before passing them to
//! [`SocketShipper`](super::SocketShipper) for runtime use.

use std::time::Duration;

use crate::rate_limited_warner::DEFAULT_WARN_INTERVAL;

use super::transport::{SocketTransport, TcpTransport};

/// Default bounded queue capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 5000;
/// Default connection timeout applied when establishing sockets.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(4);
/// Default write timeout applied to socket writes.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default bound on how long `flush` and `close` wait for the worker.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);
/// Default sleep before the first connection attempt.
pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_millis(100);
/// Default factor applied to the sleep after each failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.2;
/// Default maximum sleep between reconnection attempts.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);

/// Configuration object describing how to construct a [`SocketShipper`](super::SocketShipper).
#[derive(Clone, Debug)]
pub struct ShipperConfig {
    pub capacity: usize,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    pub flush_timeout: Duration,
    pub transport: SocketTransport,
    pub backoff: BackoffPolicy,
    pub warn_interval: Duration,
}

/// Provide defaults that favour local development whilst encouraging
/// production callers to override the transport via the builder APIs.
impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CHANNEL_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            transport: SocketTransport::Tcp(TcpTransport {
                host: "localhost".into(),
                port: 5140,
                tls: None,
            }),
            backoff: BackoffPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

impl ShipperConfig {
    /// Override the transport configuration.
    pub fn with_transport(mut self, transport: SocketTransport) -> Self {
        self.transport = transport;
        self
    }
}

/// Multiplicative backoff applied between reconnection attempts.
#[derive(Clone, Debug, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_BACKOFF_INITIAL,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            cap: DEFAULT_BACKOFF_CAP,
        }
    }
}
