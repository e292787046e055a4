//! Log event representation shipped by the log transports.
//!
//! A [`LogEvent`] is created on the caller's thread and consumed exactly once
//! by a handler. It carries the channel (logical logger name), severity,
//! message text, and the source metadata that ends up in `@fields` on the
//! wire.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use crate::level::Level;

/// Source location and structured context attached to an event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventMetadata {
    /// Source file the event originated from.
    pub filename: String,
    /// Line number in `filename`.
    pub line_number: u32,
    /// Function or module path that emitted the event.
    pub function: String,
    /// Time the event was created.
    pub timestamp: SystemTime,
    /// Extra structured fields merged into `@fields`.
    pub key_values: BTreeMap<String, String>,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            filename: String::new(),
            line_number: 0,
            function: String::new(),
            timestamp: SystemTime::now(),
            key_values: BTreeMap::new(),
        }
    }
}

/// Exception details captured alongside an error event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Type name of the failure, e.g. `io::Error`.
    pub kind: String,
    /// Rendered traceback or error chain.
    pub traceback: String,
}

impl ExceptionInfo {
    pub fn new(kind: impl Into<String>, traceback: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            traceback: traceback.into(),
        }
    }

    /// Capture an error and its `source()` chain, one cause per line.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut traceback = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            traceback.push_str("\ncaused by: ");
            traceback.push_str(&cause.to_string());
            source = cause.source();
        }
        Self {
            kind: std::any::type_name::<E>().to_owned(),
            traceback,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogEvent {
    /// Logical channel; shipped as the single entry of `@tags`.
    pub channel: String,
    pub level: Level,
    pub message: String,
    pub metadata: EventMetadata,
    pub exception: Option<ExceptionInfo>,
}

impl LogEvent {
    /// Construct an event stamped with the current time.
    pub fn new(channel: &str, level: Level, message: &str) -> Self {
        Self {
            channel: channel.to_owned(),
            level,
            message: message.to_owned(),
            metadata: EventMetadata::default(),
            exception: None,
        }
    }

    /// Construct an event with explicit source metadata.
    pub fn with_metadata(
        channel: &str,
        level: Level,
        message: &str,
        metadata: EventMetadata,
    ) -> Self {
        Self {
            channel: channel.to_owned(),
            level,
            message: message.to_owned(),
            metadata,
            exception: None,
        }
    }

    /// Attach exception details to the event.
    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Attach a structured field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.key_values.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.channel, self.level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug, thiserror::Error)]
    #[error("request failed")]
    struct RequestError {
        #[source]
        inner: io::Error,
    }

    #[test]
    fn exception_info_renders_error_chain() {
        let err = RequestError {
            inner: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        let info = ExceptionInfo::from_error(&err);
        assert!(info.kind.ends_with("RequestError"));
        assert_eq!(info.traceback, "request failed\ncaused by: refused");
    }

    #[test]
    fn with_field_records_key_values() {
        let event = LogEvent::new("api", Level::Info, "hi").with_field("request_id", "42");
        assert_eq!(
            event.metadata.key_values.get("request_id").map(String::as_str),
            Some("42")
        );
    }
}
