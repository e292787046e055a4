//! Statsd emission over UDP or TCP.
//!
//! [`StatsConnection`] manages the socket and its reconnect gate;
//! [`StatsClient`] formats lines and provides timers and call wrappers on top
//! of it. Emission failures are logged and reported as `false`, never as
//! errors.

mod backoff;
mod client;
mod connection;
pub mod protocol;


pub(crate) use backoff::grow;
pub use backoff::{
    DEFAULT_STATS_BACKOFF_CAP, DEFAULT_STATS_BACKOFF_FLOOR, DEFAULT_STATS_BACKOFF_GROWTH,
    StatsBackoffPolicy,
};
pub use client::{StatsClient, Timer};
pub use connection::{
    DEFAULT_STATS_CONNECT_TIMEOUT, StatsConnection, StatsConnectionConfig, TimeProvider,
};
