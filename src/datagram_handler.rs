//! Synchronous log emitter sending one JSON datagram per event.
//!
//! The socket is created lazily on the first event and discarded on any send
//! error; the next event recreates it. Network failures are logged and the
//! event is dropped, so `emit` only fails once the handler is closed.

use std::{
    io,
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket},
    sync::atomic::{AtomicBool, Ordering},
};

use log::warn;
use parking_lot::Mutex;

use crate::{
    handler::{HandlerError, TelemetryHandler},
    hostname::short_hostname,
    log_record::LogEvent,
    rate_limited_warner::RateLimitedWarner,
    socket_handler::serialise::serialise_event,
};

pub struct DatagramLogHandler {
    host: String,
    port: u16,
    socket: Mutex<Option<UdpSocket>>,
    source_host: String,
    closed: AtomicBool,
    warner: RateLimitedWarner,
}

fn connect(host: &str, port: u16) -> io::Result<UdpSocket> {
    let target = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no address resolved"))?;
    let bind_addr = match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    };
    let socket = UdpSocket::bind(bind_addr)?;
    socket.connect(target)?;
    Ok(socket)
}

impl DatagramLogHandler {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            socket: Mutex::new(None),
            source_host: short_hostname(),
            closed: AtomicBool::new(false),
            warner: RateLimitedWarner::default(),
        }
    }

    /// Events lost to send failures.
    pub fn dropped(&self) -> u64 {
        self.warner.dropped()
    }

    fn send(&self, payload: &[u8]) -> io::Result<()> {
        let mut guard = self.socket.lock();
        if guard.is_none() {
            *guard = Some(connect(&self.host, self.port)?);
        }
        let Some(socket) = guard.as_ref() else {
            return Err(io::ErrorKind::NotConnected.into());
        };
        if let Err(err) = socket.send(payload) {
            *guard = None;
            return Err(err);
        }
        Ok(())
    }
}

impl TelemetryHandler for DatagramLogHandler {
    fn emit(&self, event: LogEvent) -> Result<(), HandlerError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(HandlerError::Closed);
        }
        let payload = serialise_event(&event, &self.source_host)?;
        if let Err(err) = self.send(&payload) {
            self.warner.record_drop();
            self.warner.warn_if_due(|count| {
                warn!(
                    "error sending event to log server {}:{}: {err}; dropped {count} events",
                    self.host, self.port
                );
            });
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.socket.lock().take();
    }
}

impl std::fmt::Debug for DatagramLogHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramLogHandler")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use rstest::{fixture, rstest};
    use serde_json::Value;
    use std::time::Duration;

    #[fixture]
    fn collector() -> UdpSocket {
        let socket = UdpSocket::bind(("127.0.0.1", 0)).expect("bind collector");
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .expect("set read timeout");
        socket
    }

    #[rstest]
    fn sends_one_json_datagram_per_event(collector: UdpSocket) {
        let port = collector.local_addr().expect("collector addr").port();
        let handler = DatagramLogHandler::new("127.0.0.1", port);
        handler
            .emit(LogEvent::new("jobs", Level::Warning, "slow"))
            .expect("emit");

        let mut buf = [0u8; 2048];
        let len = collector.recv(&mut buf).expect("datagram");
        assert_eq!(buf[len - 1], b'\n');
        let value: Value = serde_json::from_slice(&buf[..len]).expect("json");
        assert_eq!(value["@tags"][0], "jobs");
        assert_eq!(value["@fields"]["level"], "WARNING");
    }

    #[rstest]
    fn unresolvable_host_drops_without_error() {
        let handler = DatagramLogHandler::new("host.invalid", 9);
        handler
            .emit(LogEvent::new("jobs", Level::Info, "lost"))
            .expect("network failures are not caller errors");
        assert_eq!(handler.dropped(), 1);
    }

    #[rstest]
    fn closed_handler_rejects_events() {
        let handler = DatagramLogHandler::new("127.0.0.1", 9);
        handler.close();
        let err = handler
            .emit(LogEvent::new("jobs", Level::Info, "late"))
            .expect_err("closed");
        assert!(matches!(err, HandlerError::Closed));
    }
}
