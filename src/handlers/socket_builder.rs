//! Builder for [`SocketShipper`](crate::socket_handler::SocketShipper).
//!
//! Exposes transport selection, timeout tuning, TLS configuration, and
//! backoff parameters, validating everything before the worker thread is
//! spawned.

use std::{path::PathBuf, time::Duration};

use crate::socket_handler::{
    BackoffPolicy, ShipperConfig, SocketShipper, SocketTransport, TcpTransport, TlsOptions,
    UnixTransport,
};

use super::{HandlerBuildError, HandlerBuilderTrait};

#[derive(Clone, Debug)]
enum TransportConfig {
    Tcp { host: String, port: u16 },
    Unix { path: PathBuf },
}

#[derive(Clone, Debug, Default)]
struct TlsConfig {
    domain: Option<String>,
    ca_file: Option<PathBuf>,
    insecure: bool,
}

/// Largest growth factor accepted for the reconnect backoff.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

/// Overrides for the reconnect backoff applied by the shipper.
#[derive(Clone, Debug, Default)]
pub struct BackoffOverrides {
    initial_ms: Option<u64>,
    multiplier: Option<f64>,
    cap_ms: Option<u64>,
}

macro_rules! ensure_positive {
    ($value:expr, $field:expr) => {{
        if $value == 0 {
            Err(HandlerBuildError::InvalidConfig(format!(
                "{} must be greater than zero",
                $field
            )))
        } else {
            Ok($value)
        }
    }};
}

impl BackoffOverrides {
    /// Create overrides with no custom values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the sleep before the first connection attempt.
    pub fn with_initial_ms(mut self, initial_ms: u64) -> Self {
        self.initial_ms = Some(initial_ms);
        self
    }

    /// Override the growth factor applied after each failure.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Override the maximum sleep in milliseconds.
    pub fn with_cap_ms(mut self, cap_ms: u64) -> Self {
        self.cap_ms = Some(cap_ms);
        self
    }

    fn apply(&self, policy: &mut BackoffPolicy) -> Result<(), HandlerBuildError> {
        if let Some(initial) = self.initial_ms {
            policy.initial = Duration::from_millis(initial);
        }
        if let Some(multiplier) = self.multiplier {
            if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&multiplier) {
                return Err(HandlerBuildError::InvalidConfig(format!(
                    "backoff_multiplier must be between 1.0 and {MAX_BACKOFF_MULTIPLIER}, \
                     got {multiplier}"
                )));
            }
            policy.multiplier = multiplier;
        }
        if let Some(cap) = self.cap_ms {
            ensure_positive!(cap, "backoff_cap_ms")?;
            policy.cap = Duration::from_millis(cap);
        }
        if policy.cap < policy.initial {
            return Err(HandlerBuildError::InvalidConfig(
                "backoff_cap_ms must not be smaller than backoff_initial_ms".into(),
            ));
        }
        Ok(())
    }
}

macro_rules! option_setter {
    ($(#[$meta:meta])* $fn_name:ident, $field:ident, $ty:ty) => {
        $(#[$meta])*
        pub fn $fn_name(mut self, value: $ty) -> Self {
            self.$field = Some(value);
            self
        }
    };
}

/// Builder for constructing [`SocketShipper`] instances.
#[derive(Clone, Debug, Default)]
pub struct ShipperBuilder {
    capacity: Option<usize>,
    connect_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    flush_timeout_ms: Option<u64>,
    transport: Option<TransportConfig>,
    tls: Option<TlsConfig>,
    backoff: BackoffOverrides,
}

impl ShipperBuilder {
    /// Create a new builder with no transport configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the builder to use TCP.
    pub fn with_tcp(mut self, host: impl Into<String>, port: u16) -> Self {
        self.transport = Some(TransportConfig::Tcp {
            host: host.into(),
            port,
        });
        self
    }

    /// Configure the builder to use a Unix domain socket.
    pub fn with_unix_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.transport = Some(TransportConfig::Unix { path: path.into() });
        self
    }

    /// Wrap the TCP connection in TLS.
    ///
    /// `domain` defaults to the TCP host. `ca_file` restricts trust to the
    /// roots in that PEM bundle.
    pub fn with_tls(
        mut self,
        domain: Option<String>,
        ca_file: Option<PathBuf>,
        insecure: bool,
    ) -> Self {
        self.tls = Some(TlsConfig {
            domain,
            ca_file,
            insecure,
        });
        self
    }

    option_setter!(
        #[doc = "Set the bounded queue capacity."]
        with_capacity,
        capacity,
        usize
    );
    option_setter!(with_connect_timeout_ms, connect_timeout_ms, u64);
    option_setter!(with_write_timeout_ms, write_timeout_ms, u64);
    option_setter!(with_flush_timeout_ms, flush_timeout_ms, u64);

    /// Override backoff timings using the provided overrides.
    pub fn with_backoff(mut self, overrides: BackoffOverrides) -> Self {
        self.backoff = overrides;
        self
    }

    fn validate(&self) -> Result<(), HandlerBuildError> {
        self.validate_transport()?;
        if let Some(capacity) = self.capacity {
            ensure_positive!(capacity, "capacity")?;
        }
        self.validate_timeouts()
    }

    fn validate_transport(&self) -> Result<(), HandlerBuildError> {
        match &self.transport {
            None => Err(HandlerBuildError::InvalidConfig(
                "log shipper requires a transport".into(),
            )),
            Some(TransportConfig::Unix { .. }) if self.tls.is_some() => Err(
                HandlerBuildError::InvalidConfig("tls is only supported for tcp transports".into()),
            ),
            Some(TransportConfig::Tcp { host, .. }) if host.trim().is_empty() => Err(
                HandlerBuildError::InvalidConfig("tcp host must not be empty".into()),
            ),
            _ => Ok(()),
        }
    }

    fn validate_timeouts(&self) -> Result<(), HandlerBuildError> {
        for (field, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("flush_timeout_ms", self.flush_timeout_ms),
        ] {
            if let Some(timeout) = value {
                ensure_positive!(timeout, field)?;
            }
        }
        Ok(())
    }

    /// Validate the builder and produce the runtime configuration.
    pub fn build_config(&self) -> Result<ShipperConfig, HandlerBuildError> {
        self.validate()?;
        let mut config = ShipperConfig::default();
        self.apply_optional_fields(&mut config);
        if let Some(transport) = &self.transport {
            config.transport = self.build_transport_config(transport);
        }
        self.backoff.apply(&mut config.backoff)?;
        Ok(config)
    }

    fn apply_optional_fields(&self, config: &mut ShipperConfig) {
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(timeout) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(timeout);
        }
        if let Some(timeout) = self.write_timeout_ms {
            config.write_timeout = Duration::from_millis(timeout);
        }
        if let Some(timeout) = self.flush_timeout_ms {
            config.flush_timeout = Duration::from_millis(timeout);
        }
    }

    fn build_transport_config(&self, transport: &TransportConfig) -> SocketTransport {
        match transport {
            TransportConfig::Tcp { host, port } => SocketTransport::Tcp(TcpTransport {
                host: host.clone(),
                port: *port,
                tls: self.build_tls_options(host),
            }),
            TransportConfig::Unix { path } => {
                SocketTransport::Unix(UnixTransport { path: path.clone() })
            }
        }
    }

    fn build_tls_options(&self, host: &str) -> Option<TlsOptions> {
        self.tls.as_ref().map(|tls_cfg| {
            let domain = tls_cfg
                .domain
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| host.to_owned());
            TlsOptions {
                domain,
                ca_file: tls_cfg.ca_file.clone(),
                insecure_skip_verify: tls_cfg.insecure,
            }
        })
    }
}

impl HandlerBuilderTrait for ShipperBuilder {
    type Handler = SocketShipper;

    fn build_inner(&self) -> Result<Self::Handler, HandlerBuildError> {
        let config = self.build_config()?;
        Ok(SocketShipper::with_config(config)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn invalid_message(builder: ShipperBuilder) -> String {
        match builder.build_config() {
            Err(HandlerBuildError::InvalidConfig(msg)) => msg,
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[rstest]
    fn builder_requires_transport() {
        assert!(invalid_message(ShipperBuilder::new()).contains("transport"));
    }

    #[rstest]
    fn builder_rejects_zero_capacity() {
        let msg = invalid_message(
            ShipperBuilder::new()
                .with_tcp("127.0.0.1", 5140)
                .with_capacity(0),
        );
        assert!(msg.contains("capacity"));
    }

    #[rstest]
    fn builder_rejects_tls_for_unix() {
        let msg = invalid_message(
            ShipperBuilder::new()
                .with_unix_path("/tmp/clay.sock")
                .with_tls(Some("example.com".into()), None, false),
        );
        assert!(msg.contains("tls"));
    }

    #[rstest]
    #[case(BackoffOverrides::new().with_multiplier(0.5), "multiplier")]
    #[case(BackoffOverrides::new().with_multiplier(1e300), "multiplier")]
    #[case(BackoffOverrides::new().with_multiplier(f64::INFINITY), "multiplier")]
    #[case(BackoffOverrides::new().with_multiplier(f64::NAN), "multiplier")]
    #[case(BackoffOverrides::new().with_cap_ms(0), "backoff_cap_ms")]
    #[case(BackoffOverrides::new().with_initial_ms(500).with_cap_ms(100), "smaller")]
    fn builder_rejects_bad_backoff(#[case] overrides: BackoffOverrides, #[case] needle: &str) {
        let msg = invalid_message(
            ShipperBuilder::new()
                .with_tcp("127.0.0.1", 5140)
                .with_backoff(overrides),
        );
        assert!(msg.contains(needle), "{msg}");
    }

    #[rstest]
    fn tls_domain_defaults_to_host() {
        let config = ShipperBuilder::new()
            .with_tcp("logs.internal", 6514)
            .with_tls(None, Some("/etc/ssl/ca.pem".into()), false)
            .with_capacity(10)
            .with_connect_timeout_ms(250)
            .build_config()
            .expect("valid config");
        assert_eq!(config.capacity, 10);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        let SocketTransport::Tcp(tcp) = config.transport else {
            panic!("tcp transport expected");
        };
        let tls = tcp.tls.expect("tls options");
        assert_eq!(tls.domain, "logs.internal");
        assert_eq!(tls.ca_file, Some(PathBuf::from("/etc/ssl/ca.pem")));
    }
}
