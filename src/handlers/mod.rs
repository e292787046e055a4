//! Handler builders and associated traits.
//!
//! Each builder implements [`HandlerBuilderTrait`], validating its options
//! before constructing the concrete transport. [`handler_from_settings`]
//! picks the transport described by [`LoggingSettings`].

use std::io;

use thiserror::Error;

use crate::{
    config::{LogProtocol, LoggingSettings},
    datagram_handler::DatagramLogHandler,
    handler::TelemetryHandler,
};

pub mod socket_builder;

pub use socket_builder::{BackoffOverrides, MAX_BACKOFF_MULTIPLIER, ShipperBuilder};

/// Errors that may occur while building a handler.
#[derive(Debug, Error)]
pub enum HandlerBuildError {
    /// Invalid user supplied configuration.
    #[error("invalid handler configuration: {0}")]
    InvalidConfig(String),
    /// Underlying I/O error whilst creating the handler.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Trait implemented by all handler builders.
pub trait HandlerBuilderTrait: Send + Sync {
    /// Concrete handler produced by the builder.
    type Handler: TelemetryHandler + 'static;

    /// Validate the options and build the concrete handler.
    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError>;

    /// Build the handler behind a trait object.
    fn build(&self) -> Result<Box<dyn TelemetryHandler>, HandlerBuildError> {
        Ok(Box::new(self.build_inner()?))
    }
}

/// Build the log transport described by `settings`.
///
/// TCP settings produce a [`SocketShipper`](crate::socket_handler::SocketShipper),
/// wrapped in TLS when a CA bundle is configured. UDP settings produce a
/// [`DatagramLogHandler`].
pub fn handler_from_settings(
    settings: &LoggingSettings,
) -> Result<Box<dyn TelemetryHandler>, HandlerBuildError> {
    if settings.host.trim().is_empty() {
        return Err(HandlerBuildError::InvalidConfig(
            "logging host must not be empty".into(),
        ));
    }
    match settings.protocol {
        LogProtocol::Tcp => {
            let mut builder = ShipperBuilder::new().with_tcp(settings.host.clone(), settings.port);
            if let Some(ca_file) = &settings.ssl_ca_file {
                builder = builder.with_tls(None, Some(ca_file.clone()), false);
            }
            builder.build()
        }
        LogProtocol::Udp => Ok(Box::new(DatagramLogHandler::new(
            settings.host.clone(),
            settings.port,
        ))),
    }
}
