//! Resilient telemetry transport.
//!
//! Two independent channels leave the process: StatsD-style metrics through
//! [`StatsClient`] and structured JSON log events through a
//! [`TelemetryHandler`]. Neither channel ever lets a collector outage block
//! or fail the caller.

pub mod config;
pub mod datagram_handler;
pub mod handler;
pub mod handlers;
pub mod hostname;
pub mod level;
#[cfg(feature = "log-compat")]
pub mod log_compat;
pub mod log_record;
pub mod rate_limited_warner;
pub mod socket_handler;
pub mod stats;

pub use config::{
    ConfigError, LogProtocol, LoggingSettings, StatsProtocol, StatsdSettings, TelemetryConfig,
};
pub use datagram_handler::DatagramLogHandler;
pub use handler::{HandlerError, TelemetryHandler};
pub use handlers::{
    BackoffOverrides, HandlerBuildError, HandlerBuilderTrait, ShipperBuilder,
    handler_from_settings,
};
pub use level::{Level, ParseLevelError};
#[cfg(feature = "log-compat")]
pub use log_compat::{TelemetryLogAdapter, install_global_logger, install_remote_logging};
pub use log_record::{EventMetadata, ExceptionInfo, LogEvent};
pub use socket_handler::{ShipperConfig, SocketShipper, SocketTransport};
pub use stats::{StatsClient, StatsConnection, Timer};
