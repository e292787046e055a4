//! Asynchronous, reconnecting log shipper.
//!
//! This module defines [`SocketShipper`], a handler that queues
//! [`LogEvent`](crate::log_record::LogEvent) values and ships them as
//! newline-delimited JSON from a dedicated worker thread. The worker owns the
//! connection, reconnects after a backoff sleep, and requeues any event whose
//! delivery failed. TCP (optionally wrapped in TLS) and Unix domain sockets
//! are supported out of the box; other transports plug in through
//! [`Connector`].

mod backoff;
mod config;
mod handler;
pub(crate) mod serialise;
mod transport;
mod worker;


pub use config::{
    BackoffPolicy, DEFAULT_BACKOFF_CAP, DEFAULT_BACKOFF_INITIAL, DEFAULT_BACKOFF_MULTIPLIER,
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FLUSH_TIMEOUT,
    DEFAULT_WRITE_TIMEOUT, ShipperConfig,
};
pub use handler::SocketShipper;
pub use transport::{
    ActiveConnection, Connector, SocketTransport, TcpTransport, TlsOptions, TransportConnector,
    UnixTransport,
};
