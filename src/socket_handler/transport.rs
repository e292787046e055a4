//! Transport primitives for the log shipper.

use std::{
    fs,
    io::{self, Write},
    net::{SocketAddr, TcpStream, ToSocketAddrs},
    path::PathBuf,
    time::Duration,
};

use native_tls::{Certificate, TlsConnector, TlsStream};

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Transport targeted by the shipper.
#[derive(Clone, Debug)]
pub enum SocketTransport {
    /// TCP transport with optional TLS.
    Tcp(TcpTransport),
    /// Unix domain socket transport.
    Unix(UnixTransport),
}

/// TCP transport configuration.
#[derive(Clone, Debug)]
pub struct TcpTransport {
    /// Hostname or IP address to connect to.
    pub host: String,
    /// TCP port number.
    pub port: u16,
    /// Optional TLS configuration.
    pub tls: Option<TlsOptions>,
}

impl TcpTransport {
    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }
}

/// Unix domain socket configuration.
#[derive(Clone, Debug)]
pub struct UnixTransport {
    /// Path to the socket file.
    pub path: PathBuf,
}

/// TLS connection options.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Domain name presented during the TLS handshake.
    pub domain: String,
    /// PEM bundle of trusted roots. When set, only these roots are trusted.
    pub ca_file: Option<PathBuf>,
    /// Skip certificate validation when true (intended for tests).
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    fn connector(&self) -> io::Result<TlsConnector> {
        let mut builder = TlsConnector::builder();
        if let Some(path) = &self.ca_file {
            let pem = fs::read(path)?;
            let cert = Certificate::from_pem(&pem).map_err(io::Error::other)?;
            builder.add_root_certificate(cert);
            builder.disable_built_in_roots(true);
        }
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build().map_err(io::Error::other)
    }
}

/// Active socket connection state.
pub enum ActiveConnection {
    PlainTcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ActiveConnection {
    /// Update the write timeout for the underlying socket.
    pub fn set_write_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.set_write_timeout(Some(timeout)),
            ActiveConnection::Tls(stream) => stream.get_ref().set_write_timeout(Some(timeout)),
            #[cfg(unix)]
            ActiveConnection::Unix(stream) => stream.set_write_timeout(Some(timeout)),
        }
    }
}

impl Write for ActiveConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.write(buf),
            ActiveConnection::Tls(stream) => stream.write(buf),
            #[cfg(unix)]
            ActiveConnection::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ActiveConnection::PlainTcp(stream) => stream.flush(),
            ActiveConnection::Tls(stream) => stream.flush(),
            #[cfg(unix)]
            ActiveConnection::Unix(stream) => stream.flush(),
        }
    }
}

fn connect_tcp(config: &TcpTransport, timeout: Duration) -> io::Result<TcpStream> {
    let addrs = config.socket_addrs()?;
    let mut last_err = None;
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_nonblocking(false)?;
                return Ok(stream);
            }
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotConnected,
            format!("unable to connect to {}:{}", config.host, config.port),
        )
    }))
}

/// Establish a socket connection using the provided transport definition.
pub fn connect_transport(
    transport: &SocketTransport,
    connect_timeout: Duration,
) -> io::Result<ActiveConnection> {
    match transport {
        SocketTransport::Tcp(config) => {
            let stream = connect_tcp(config, connect_timeout)?;
            if let Some(tls) = &config.tls {
                let connector = tls.connector()?;
                stream.set_read_timeout(Some(connect_timeout))?;
                stream.set_write_timeout(Some(connect_timeout))?;
                let stream = connector
                    .connect(&tls.domain, stream)
                    .map_err(io::Error::other)?;
                let tcp_ref = stream.get_ref();
                tcp_ref.set_read_timeout(None)?;
                tcp_ref.set_write_timeout(None)?;
                Ok(ActiveConnection::Tls(Box::new(stream)))
            } else {
                Ok(ActiveConnection::PlainTcp(stream))
            }
        }
        SocketTransport::Unix(config) => {
            #[cfg(unix)]
            {
                let stream = UnixStream::connect(&config.path)?;
                Ok(ActiveConnection::Unix(stream))
            }
            #[cfg(not(unix))]
            {
                let _ = (config, connect_timeout);
                Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "unix domain sockets are not supported on this platform",
                ))
            }
        }
    }
}

/// Source of fresh connections for the shipper worker.
///
/// The worker calls `connect` whenever it has no live connection; any error
/// returned here is treated like a failed write.
pub trait Connector: Send + 'static {
    type Connection: Write + Send + 'static;

    fn connect(&mut self) -> io::Result<Self::Connection>;
}

/// [`Connector`] dialling a [`SocketTransport`].
#[derive(Clone, Debug)]
pub struct TransportConnector {
    transport: SocketTransport,
    connect_timeout: Duration,
    write_timeout: Duration,
}

impl TransportConnector {
    pub fn new(
        transport: SocketTransport,
        connect_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            connect_timeout,
            write_timeout,
        }
    }
}

impl Connector for TransportConnector {
    type Connection = ActiveConnection;

    fn connect(&mut self) -> io::Result<ActiveConnection> {
        let mut conn = connect_transport(&self.transport, self.connect_timeout)?;
        conn.set_write_timeout(self.write_timeout)?;
        Ok(conn)
    }
}
