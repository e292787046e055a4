//! Lazily connected, protocol-selectable socket to the stats collector.
//!
//! [`StatsConnection`] owns at most one socket. The socket is created on the
//! first send, torn down on any I/O error, and recreated on a later send.
//! Stream connections that fail open a backoff window during which sends
//! return `false` immediately instead of reconnecting. All socket state
//! transitions happen under a single mutex so one connection can be shared by
//! every thread in the process.

use std::{
    io::{self, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    config::{StatsProtocol, StatsdSettings, TelemetryConfig},
    rate_limited_warner::{DEFAULT_WARN_INTERVAL, RateLimitedWarner},
};

use super::backoff::{ConnectBackoff, StatsBackoffPolicy};

/// Timeout applied to stream connects and stream writes.
pub const DEFAULT_STATS_CONNECT_TIMEOUT: Duration = Duration::from_secs(4);

/// Source of the current instant; replaceable so tests can drive the
/// backoff window.
pub type TimeProvider = Box<dyn Fn() -> Instant + Send + Sync>;

#[derive(Clone, Debug)]
pub struct StatsConnectionConfig {
    pub connect_timeout: Duration,
    pub backoff: StatsBackoffPolicy,
    pub warn_interval: Duration,
}

impl Default for StatsConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_STATS_CONNECT_TIMEOUT,
            backoff: StatsBackoffPolicy::default(),
            warn_interval: DEFAULT_WARN_INTERVAL,
        }
    }
}

enum StatsSocket {
    Datagram { socket: UdpSocket, target: SocketAddr },
    Stream(TcpStream),
}

impl StatsSocket {
    fn protocol(&self) -> StatsProtocol {
        match self {
            StatsSocket::Datagram { .. } => StatsProtocol::Udp,
            StatsSocket::Stream(_) => StatsProtocol::Tcp,
        }
    }

    fn send_line(&mut self, line: &[u8]) -> io::Result<()> {
        match self {
            StatsSocket::Datagram { socket, target } => {
                let sent = socket.send_to(line, *target)?;
                if sent != line.len() {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("datagram truncated: sent {sent} of {} bytes", line.len()),
                    ));
                }
                Ok(())
            }
            StatsSocket::Stream(stream) => stream.write_all(line),
        }
    }
}

struct ConnectionState {
    socket: Option<StatsSocket>,
    backoff: ConnectBackoff,
}

fn resolve(settings: &StatsdSettings) -> io::Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (settings.host.as_str(), settings.port)
        .to_socket_addrs()?
        .collect();
    if addrs.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{}:{} resolved to no addresses", settings.host, settings.port),
        ));
    }
    Ok(addrs)
}

fn open_datagram(settings: &StatsdSettings) -> io::Result<StatsSocket> {
    let target = resolve(settings)?[0];
    let bind_addr = if target.is_ipv4() {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
    } else {
        SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
    };
    let socket = UdpSocket::bind(bind_addr)?;
    Ok(StatsSocket::Datagram { socket, target })
}

fn open_stream(settings: &StatsdSettings, timeout: Duration) -> io::Result<StatsSocket> {
    let mut last_err = None;
    for addr in resolve(settings)? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_write_timeout(Some(timeout))?;
                stream.set_nodelay(true)?;
                return Ok(StatsSocket::Stream(stream));
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotConnected,
            format!("unable to connect to {}:{}", settings.host, settings.port),
        )
    }))
}

/// Connection manager for the stats transport.
pub struct StatsConnection {
    settings: Option<StatsdSettings>,
    config: StatsConnectionConfig,
    state: Mutex<ConnectionState>,
    clock: TimeProvider,
    connect_attempts: AtomicU64,
    warner: RateLimitedWarner,
}

impl StatsConnection {
    /// Create a connection for `settings`; `None` disables emission.
    pub fn new(settings: Option<StatsdSettings>) -> Self {
        Self::with_config(settings, StatsConnectionConfig::default())
    }

    pub fn with_config(settings: Option<StatsdSettings>, config: StatsConnectionConfig) -> Self {
        Self {
            settings,
            state: Mutex::new(ConnectionState {
                socket: None,
                backoff: ConnectBackoff::new(config.backoff.clone()),
            }),
            warner: RateLimitedWarner::new(config.warn_interval),
            config,
            clock: Box::new(Instant::now),
            connect_attempts: AtomicU64::new(0),
        }
    }

    /// A connection that never sends anything.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(StatsdSettings::from_config(config))
    }

    /// Replace the clock consulted by the backoff gate.
    pub fn with_time_provider(mut self, clock: TimeProvider) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> Option<&StatsdSettings> {
        self.settings.as_ref()
    }

    /// Return the protocol of a live socket, creating one if allowed.
    ///
    /// `None` means stats are disabled, the protocol is unknown, the backoff
    /// window is still open, or the connection attempt failed.
    pub fn get_socket(&self) -> Option<StatsProtocol> {
        let mut state = self.state.lock();
        self.socket(&mut state).map(|socket| socket.protocol())
    }

    fn socket<'a>(&self, state: &'a mut ConnectionState) -> Option<&'a mut StatsSocket> {
        if state.socket.is_none() {
            state.socket = self.open(&mut state.backoff);
        }
        state.socket.as_mut()
    }

    fn open(&self, backoff: &mut ConnectBackoff) -> Option<StatsSocket> {
        let settings = self.settings.as_ref()?;
        let now = (self.clock)();
        if backoff.is_waiting(now) {
            return None;
        }
        match &settings.protocol {
            StatsProtocol::Udp => match open_datagram(settings) {
                Ok(socket) => Some(socket),
                Err(err) => {
                    self.warner.record_drop();
                    self.warner.warn_if_due(|count| {
                        warn!(
                            "stats: cannot create udp socket for {}:{}: {err}; dropped {count} lines",
                            settings.host, settings.port
                        );
                    });
                    None
                }
            },
            StatsProtocol::Tcp => {
                self.connect_attempts.fetch_add(1, Ordering::Relaxed);
                match open_stream(settings, self.config.connect_timeout) {
                    Ok(socket) => {
                        debug!("stats: connected to {}:{}", settings.host, settings.port);
                        backoff.record_success();
                        Some(socket)
                    }
                    Err(err) => {
                        let wait = backoff.record_failure(now);
                        warn!(
                            "stats: connection to {}:{} failed: {err}; retrying in {:.3}s",
                            settings.host,
                            settings.port,
                            wait.as_secs_f64()
                        );
                        None
                    }
                }
            }
            StatsProtocol::Other(name) => {
                self.warner.record_drop();
                self.warner.warn_if_due(|count| {
                    warn!("stats: unknown protocol {name:?}; dropped {count} lines");
                });
                None
            }
        }
    }

    /// Close and forget the socket. Safe to call at any time.
    pub fn reset(&self) {
        self.state.lock().socket = None;
    }

    /// Send one line, appending the trailing newline if missing.
    ///
    /// Returns `false` when nothing was sent; never panics or propagates
    /// I/O errors.
    pub fn send(&self, line: &str) -> bool {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        if !line.ends_with('\n') {
            buf.push(b'\n');
        }

        let mut state = self.state.lock();
        let Some(socket) = self.socket(&mut state) else {
            return false;
        };
        match socket.send_line(&buf) {
            Ok(()) => true,
            Err(err) => {
                warn!("stats: send failed: {err}; resetting connection");
                state.socket = None;
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().socket.is_some()
    }

    /// Current backoff interval applied after the next stream failure.
    pub fn backoff_interval(&self) -> Duration {
        self.state.lock().backoff.interval()
    }

    /// Instant before which no new stream connection will be attempted.
    pub fn next_retry(&self) -> Option<Instant> {
        self.state.lock().backoff.next_retry()
    }

    /// Number of stream connection attempts made so far.
    pub fn connect_attempts(&self) -> u64 {
        self.connect_attempts.load(Ordering::Relaxed)
    }

    /// Lines discarded because the protocol is unknown or no socket could be
    /// created.
    pub fn dropped(&self) -> u64 {
        self.warner.dropped()
    }
}

impl std::fmt::Debug for StatsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsConnection")
            .field("settings", &self.settings)
            .field("connected", &self.is_connected())
            .finish()
    }
}
