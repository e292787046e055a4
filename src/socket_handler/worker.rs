//! Worker thread driving shipper I/O.
//!
//! The worker owns the connection. It dequeues events in order, serialises
//! them, reconnects (sleeping for the current backoff first) when no
//! connection is live, and writes each line in full. A failed delivery closes
//! the connection, grows the backoff, and puts the event back at the tail of
//! the queue.

use std::{
    io::{self, Write},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, error, warn};

use crate::{handler::HandlerError, log_record::LogEvent, rate_limited_warner::RateLimitedWarner};

use super::{
    backoff::BackoffState, config::ShipperConfig, serialise::serialise_event, transport::Connector,
};

/// Commands processed by the worker thread.
#[derive(Debug)]
pub enum ShipperCommand {
    Event(LogEvent),
    Flush(Sender<()>),
    /// Sentinel: exit once everything queued ahead of it has been handled.
    Shutdown,
}

/// State shared between the handler and its worker.
pub(crate) struct SharedState {
    pub(crate) warner: RateLimitedWarner,
    /// Set when the shutdown sentinel could not be queued; the worker exits
    /// before taking its next command.
    pub(crate) abandon: AtomicBool,
}

pub(crate) fn spawn_worker<C: Connector>(
    config: &ShipperConfig,
    connector: C,
    shared: Arc<SharedState>,
    source_host: String,
) -> io::Result<(Sender<ShipperCommand>, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded(config.capacity);
    let worker = Worker {
        connector,
        connection: None,
        backoff: BackoffState::new(config.backoff.clone()),
        requeue: tx.clone(),
        shared,
        source_host,
    };
    let handle = thread::Builder::new()
        .name("clay-log-shipper".into())
        .spawn(move || worker.run(rx))?;
    Ok((tx, handle))
}

struct Worker<C: Connector> {
    connector: C,
    connection: Option<C::Connection>,
    backoff: BackoffState,
    requeue: Sender<ShipperCommand>,
    shared: Arc<SharedState>,
    source_host: String,
}

impl<C: Connector> Worker<C> {
    fn run(mut self, rx: Receiver<ShipperCommand>) {
        debug!("log shipper thread started");
        while !self.shared.abandon.load(Ordering::Acquire) {
            let Ok(cmd) = rx.recv() else {
                break;
            };
            match cmd {
                ShipperCommand::Event(event) => self.ship(event),
                ShipperCommand::Flush(ack) => {
                    if let Some(conn) = self.connection.as_mut()
                        && let Err(err) = conn.flush()
                    {
                        warn!("log shipper flush failed: {err}");
                    }
                    let _ = ack.send(());
                }
                ShipperCommand::Shutdown => break,
            }
        }
        self.connection = None;
        debug!("log shipper thread exited cleanly");
    }

    fn ship(&mut self, event: LogEvent) {
        let payload = match serialise_event(&event, &self.source_host) {
            Ok(payload) => payload,
            Err(err) => {
                error!("log shipper cannot serialise event: {err}");
                return;
            }
        };
        match self.deliver(&payload) {
            Ok(()) => self.backoff.record_success(),
            Err(err) => self.handle_error(event, err),
        }
    }

    fn deliver(&mut self, payload: &[u8]) -> io::Result<()> {
        if self.connection.is_none() {
            let wait = self.backoff.current();
            debug!("log shipper connecting (backoff: {:.3}s)", wait.as_secs_f64());
            sleep(wait);
            self.connection = Some(self.connector.connect()?);
        }
        let Some(conn) = self.connection.as_mut() else {
            return Err(io::ErrorKind::NotConnected.into());
        };
        conn.write_all(payload)?;
        conn.flush()
    }

    fn handle_error(&mut self, event: LogEvent, err: io::Error) {
        if self.connection.take().is_some() {
            debug!("log shipper closing socket");
        }
        let next = self.backoff.record_failure();
        warn!(
            "log shipper unable to send event: {err}; requeued, next attempt in {:.3}s",
            next.as_secs_f64()
        );
        match self.requeue.try_send(ShipperCommand::Event(event)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                let warner = &self.shared.warner;
                warner.record_drop();
                warner.warn_if_due(|count| {
                    warn!("log shipper queue full while requeueing; dropped {count} events");
                });
            }
        }
    }
}

fn sleep(wait: Duration) {
    if !wait.is_zero() {
        thread::sleep(wait);
    }
}

/// Queue an event without blocking the caller.
pub(crate) fn enqueue_event(
    tx: &Sender<ShipperCommand>,
    event: LogEvent,
    warner: &RateLimitedWarner,
) -> Result<(), HandlerError> {
    match tx.try_send(ShipperCommand::Event(event)) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("log shipper queue full; dropped {count} events");
            });
            Err(HandlerError::QueueFull)
        }
        Err(TrySendError::Disconnected(_)) => {
            warner.record_drop();
            warner.warn_if_due(|count| {
                warn!("log shipper worker gone; dropped {count} events");
            });
            Err(HandlerError::Closed)
        }
    }
}

/// Wait until the worker has handled everything queued before the marker.
pub(crate) fn flush_queue(tx: &Sender<ShipperCommand>, timeout: Duration) -> bool {
    let (ack_tx, ack_rx) = bounded(1);
    if tx
        .send_timeout(ShipperCommand::Flush(ack_tx), timeout)
        .is_err()
    {
        return false;
    }
    ack_rx.recv_timeout(timeout).is_ok()
}
