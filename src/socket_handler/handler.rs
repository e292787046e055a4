//! Public shipper type exported by the crate.

use std::{
    io,
    sync::{Arc, atomic::Ordering},
    thread,
    time::Duration,
};

use crossbeam_channel::{SendTimeoutError, Sender};
use log::warn;
use parking_lot::Mutex;

use crate::{
    handler::{HandlerError, TelemetryHandler},
    hostname::short_hostname,
    log_record::LogEvent,
    rate_limited_warner::RateLimitedWarner,
};

use super::{
    SocketTransport,
    config::ShipperConfig,
    transport::{Connector, TransportConnector},
    worker::{SharedState, ShipperCommand, enqueue_event, flush_queue, spawn_worker},
};

/// Queued, reconnecting log shipper.
///
/// `emit` pushes onto a bounded queue and returns immediately. A dedicated
/// worker thread owns the socket and retries failed events until the
/// shipper is closed.
pub struct SocketShipper {
    tx: Mutex<Option<Sender<ShipperCommand>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    shared: Arc<SharedState>,
    flush_timeout: Duration,
}

impl SocketShipper {
    /// Construct a shipper targeting the provided transport with default configuration.
    pub fn new(transport: SocketTransport) -> io::Result<Self> {
        Self::with_config(ShipperConfig::default().with_transport(transport))
    }

    /// Construct the shipper from a configuration object.
    pub fn with_config(config: ShipperConfig) -> io::Result<Self> {
        let connector = TransportConnector::new(
            config.transport.clone(),
            config.connect_timeout,
            config.write_timeout,
        );
        Self::with_connector(config, connector)
    }

    /// Construct the shipper around a custom [`Connector`].
    ///
    /// `config.transport` and the timeouts are ignored; the connector decides
    /// how connections are made.
    pub fn with_connector<C: Connector>(config: ShipperConfig, connector: C) -> io::Result<Self> {
        let shared = Arc::new(SharedState {
            warner: RateLimitedWarner::new(config.warn_interval),
            abandon: Default::default(),
        });
        let (tx, handle) = spawn_worker(&config, connector, Arc::clone(&shared), short_hostname())?;
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            handle: Mutex::new(Some(handle)),
            shared,
            flush_timeout: config.flush_timeout,
        })
    }

    fn sender(&self) -> Option<Sender<ShipperCommand>> {
        self.tx.lock().clone()
    }

    /// Events dropped because the queue was full or the shipper was closed.
    pub fn dropped(&self) -> u64 {
        self.shared.warner.dropped()
    }

    /// Stop accepting events and queue the shutdown sentinel.
    ///
    /// Does not wait for the worker to drain the queue. If the sentinel
    /// cannot be queued within the flush timeout, the worker is told to stop
    /// before its next event instead.
    pub fn close(&self) {
        let Some(tx) = self.tx.lock().take() else {
            return;
        };
        match tx.send_timeout(ShipperCommand::Shutdown, self.flush_timeout) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                warn!("log shipper queue still full at close; abandoning queued events");
                self.shared.abandon.store(true, Ordering::Release);
            }
            Err(SendTimeoutError::Disconnected(_)) => {}
        }
        self.shared.warner.flush(|count| {
            warn!("log shipper dropped {count} events before close");
        });
    }

    /// Close the shipper and wait for the worker to exit.
    pub fn close_and_join(&self) {
        self.close();
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        if handle.join().is_err() {
            warn!("log shipper worker thread panicked");
        }
    }
}

impl TelemetryHandler for SocketShipper {
    fn emit(&self, event: LogEvent) -> Result<(), HandlerError> {
        let Some(tx) = self.sender() else {
            let warner = &self.shared.warner;
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("log shipper dropped {count} events after close");
            });
            return Err(HandlerError::Closed);
        };
        enqueue_event(&tx, event, &self.shared.warner)
    }

    fn flush(&self) -> bool {
        let Some(tx) = self.sender() else {
            return false;
        };
        self.shared.warner.flush(|count| {
            warn!("log shipper dropped {count} events in the last interval");
        });
        flush_queue(&tx, self.flush_timeout)
    }

    fn close(&self) {
        SocketShipper::close(self);
    }
}

impl Drop for SocketShipper {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SocketShipper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketShipper")
            .field("open", &self.tx.lock().is_some())
            .field("dropped", &self.dropped())
            .field("flush_timeout", &self.flush_timeout)
            .finish()
    }
}
