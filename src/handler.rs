//! Capability trait shared by the log transports.

use std::io;

use thiserror::Error;

use crate::log_record::LogEvent;

/// Producer-side failures returned by [`TelemetryHandler::emit`].
///
/// Network failures never surface here; they are handled by the transport.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The pending queue is at capacity and the event was dropped.
    #[error("handler queue is full")]
    QueueFull,
    /// The handler has been closed and no longer accepts events.
    #[error("handler is closed")]
    Closed,
    /// Local I/O failure that prevented the event from being accepted.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Trait implemented by every log transport.
///
/// Implementations must be shareable across threads; `emit` is called from
/// arbitrary caller threads and must not block on network I/O beyond what the
/// transport documents.
pub trait TelemetryHandler: Send + Sync {
    /// Hand an event to the transport.
    fn emit(&self, event: LogEvent) -> Result<(), HandlerError>;

    /// Push buffered events towards the network. Returns `false` when the
    /// transport could not confirm the flush.
    fn flush(&self) -> bool {
        true
    }

    /// Stop accepting events and release network resources.
    fn close(&self);
}

impl<T: TelemetryHandler + ?Sized> TelemetryHandler for std::sync::Arc<T> {
    fn emit(&self, event: LogEvent) -> Result<(), HandlerError> {
        (**self).emit(event)
    }

    fn flush(&self) -> bool {
        (**self).flush()
    }

    fn close(&self) {
        (**self).close()
    }
}

impl<T: TelemetryHandler + ?Sized> TelemetryHandler for Box<T> {
    fn emit(&self, event: LogEvent) -> Result<(), HandlerError> {
        (**self).emit(event)
    }

    fn flush(&self) -> bool {
        (**self).flush()
    }

    fn close(&self) {
        (**self).close()
    }
}
