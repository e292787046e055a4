//! Behaviour of the `TelemetryHandler` capability trait through smart pointers.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use clay_telemetry::{HandlerError, Level, LogEvent, TelemetryHandler};
use rstest::rstest;

#[derive(Default)]
struct CountingHandler {
    emitted: AtomicUsize,
    closed: AtomicBool,
}

impl TelemetryHandler for CountingHandler {
    fn emit(&self, _event: LogEvent) -> Result<(), HandlerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(HandlerError::Closed);
        }
        self.emitted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

fn event() -> LogEvent {
    LogEvent::new("tests", Level::Info, "hello")
}

#[rstest]
fn default_flush_returns_true() {
    assert!(CountingHandler::default().flush());
}

#[rstest]
fn shared_handler_forwards_through_arc_and_box() {
    let inner = Arc::new(CountingHandler::default());
    let boxed: Box<dyn TelemetryHandler> = Box::new(Arc::clone(&inner));

    boxed.emit(event()).expect("open handler accepts events");
    assert_eq!(inner.emitted.load(Ordering::SeqCst), 1);

    boxed.close();
    assert!(matches!(boxed.emit(event()), Err(HandlerError::Closed)));
    assert_eq!(inner.emitted.load(Ordering::SeqCst), 1);
}
