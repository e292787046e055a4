//! Compatibility bridge for the Rust `log` crate.
//!
//! [`TelemetryLogAdapter`] implements `log::Log` and forwards records to a
//! [`TelemetryHandler`], so applications using the `log` macros can ship
//! their output to the remote collector. Records emitted by this crate are
//! never forwarded; the transports log their own failures through `log` and
//! must not feed them back into themselves.

use std::borrow::Cow;
use std::sync::Arc;

use log::{Metadata, Record};

use crate::{
    config::{LoggingSettings, TelemetryConfig},
    handler::TelemetryHandler,
    handlers::{HandlerBuildError, handler_from_settings},
    level::Level,
    log_record::{EventMetadata, LogEvent},
};

const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Adapter implementing the Rust `log::Log` trait.
pub struct TelemetryLogAdapter {
    handler: Arc<dyn TelemetryHandler>,
    level: Level,
}

fn normalise_target(target: &str) -> Cow<'_, str> {
    if target.contains("::") {
        Cow::Owned(target.replace("::", "."))
    } else {
        Cow::Borrowed(target)
    }
}

fn is_own_target(target: &str) -> bool {
    target
        .strip_prefix(OWN_TARGET)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

impl TelemetryLogAdapter {
    /// Forward records at or above `level` to `handler`.
    pub fn new(handler: Arc<dyn TelemetryHandler>, level: Level) -> Self {
        Self { handler, level }
    }

    fn accepts(&self, level: log::Level, target: &str) -> bool {
        Level::from(level) >= self.level && !is_own_target(target)
    }

    fn to_event(record: &Record<'_>) -> LogEvent {
        let metadata = EventMetadata {
            filename: record.file().unwrap_or_default().to_owned(),
            line_number: record.line().unwrap_or(0),
            function: record.module_path().unwrap_or_default().to_owned(),
            ..Default::default()
        };
        LogEvent::with_metadata(
            normalise_target(record.target()).as_ref(),
            record.level().into(),
            &record.args().to_string(),
            metadata,
        )
    }
}

impl log::Log for TelemetryLogAdapter {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.accepts(metadata.level(), metadata.target())
    }

    fn log(&self, record: &Record<'_>) {
        if !self.accepts(record.level(), record.target()) {
            return;
        }
        // Failures are already counted and reported by the transport.
        let _ = self.handler.emit(Self::to_event(record));
    }

    fn flush(&self) {
        self.handler.flush();
    }
}

/// Install `handler` as the destination of the global Rust logger.
///
/// Returns `false` when a global logger is already set; the handler is left
/// untouched in that case.
pub fn install_global_logger(handler: Arc<dyn TelemetryHandler>, level: Level) -> bool {
    let adapter = TelemetryLogAdapter::new(handler, level);
    if log::set_boxed_logger(Box::new(adapter)).is_err() {
        return false;
    }
    log::set_max_level(level.into());
    true
}

/// Build the transport described by `logging.*` and install it globally.
///
/// Returns the installed handler, or `None` when remote logging is not
/// configured or another global logger is already present.
pub fn install_remote_logging(
    config: &TelemetryConfig,
) -> Result<Option<Arc<dyn TelemetryHandler>>, HandlerBuildError> {
    let Some(settings) = LoggingSettings::from_config(config) else {
        return Ok(None);
    };
    let handler: Arc<dyn TelemetryHandler> = Arc::from(handler_from_settings(&settings)?);
    if install_global_logger(Arc::clone(&handler), settings.level) {
        Ok(Some(handler))
    } else {
        log::warn!("global logger already installed; remote logging not enabled");
        handler.close();
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the `log` crate bridge.

    use super::*;
    use crate::handler::HandlerError;
    use log::Log;
    use parking_lot::Mutex;
    use rstest::rstest;

    #[derive(Default)]
    struct CollectingHandler {
        events: Mutex<Vec<LogEvent>>,
        flushes: Mutex<usize>,
    }

    impl TelemetryHandler for CollectingHandler {
        fn emit(&self, event: LogEvent) -> Result<(), HandlerError> {
            self.events.lock().push(event);
            Ok(())
        }

        fn flush(&self) -> bool {
            *self.flushes.lock() += 1;
            true
        }

        fn close(&self) {}
    }

    fn adapter(level: Level) -> (Arc<CollectingHandler>, TelemetryLogAdapter) {
        let handler = Arc::new(CollectingHandler::default());
        let adapter = TelemetryLogAdapter::new(handler.clone(), level);
        (handler, adapter)
    }

    #[rstest]
    fn adapter_forwards_record_metadata() {
        let (handler, adapter) = adapter(Level::Info);
        let record = Record::builder()
            .args(format_args!("hello"))
            .level(log::Level::Warn)
            .target("billing::invoices")
            .module_path(Some("billing::invoices"))
            .file(Some("invoices.rs"))
            .line(Some(42))
            .build();

        adapter.log(&record);

        let events = handler.events.lock();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.channel, "billing.invoices");
        assert_eq!(event.level, Level::Warning);
        assert_eq!(event.message, "hello");
        assert_eq!(event.metadata.filename, "invoices.rs");
        assert_eq!(event.metadata.line_number, 42);
        assert_eq!(event.metadata.function, "billing::invoices");
    }

    #[rstest]
    #[case(log::Level::Debug, "app", false)]
    #[case(log::Level::Info, "app", true)]
    #[case(log::Level::Error, "clay_telemetry::socket_handler::worker", false)]
    #[case(log::Level::Error, "clay_telemetry", false)]
    #[case(log::Level::Error, "clay_telemetry_ext", true)]
    fn adapter_filters_level_and_own_target(
        #[case] level: log::Level,
        #[case] target: &str,
        #[case] expected: bool,
    ) {
        let (_, adapter) = adapter(Level::Info);
        let metadata = Metadata::builder().level(level).target(target).build();
        assert_eq!(adapter.enabled(&metadata), expected);
    }

    #[rstest]
    fn flush_reaches_handler() {
        let (handler, adapter) = adapter(Level::Info);
        adapter.flush();
        assert_eq!(*handler.flushes.lock(), 1);
    }
}
