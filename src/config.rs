//! Configuration surface consumed by the telemetry transports.
//!
//! Configuration is a JSON document, usually assembled from several files
//! where later files override earlier ones key by key at the top level. Values
//! are addressed with dotted keys (`statsd.host`). [`StatsdSettings`] and
//! [`LoggingSettings`] extract the typed subsets the transports need; absent
//! hosts mean "disabled", not an error.

use std::{
    env, fmt, fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::level::Level;

/// Environment variable holding a `:`-separated list of config files.
pub const CONFIG_PATH_ENV: &str = "CLAY_CONFIG";
/// Default statsd port when `statsd.port` is absent.
pub const DEFAULT_STATSD_PORT: u16 = 8125;

/// Errors raised while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// The document root must be a JSON object.
    #[error("configuration root must be an object, found {0}")]
    NotAnObject(&'static str),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetryConfig {
    root: Map<String, Value>,
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl TelemetryConfig {
    /// Build a configuration from an in-memory JSON value.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ConfigError::NotAnObject(kind_of(&other))),
        }
    }

    /// Load and merge the given files in order.
    ///
    /// Missing files are skipped; unreadable or malformed files are errors.
    pub fn load<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for path in paths {
            let path = path.as_ref();
            match fs::read_to_string(path) {
                Ok(text) => {
                    let value: Value =
                        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                            path: path.to_path_buf(),
                            source,
                        })?;
                    config.merge(Self::from_value(value)?);
                    log::debug!("loaded configuration from {}", path.display());
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    log::debug!("configuration file {} not found; skipping", path.display());
                }
                Err(source) => {
                    return Err(ConfigError::Io {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
        Ok(config)
    }

    /// Load the files listed in [`CONFIG_PATH_ENV`], if set.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var(CONFIG_PATH_ENV) {
            Ok(paths) => Self::load(paths.split(':').filter(|p| !p.is_empty())),
            Err(_) => Ok(Self::default()),
        }
    }

    /// Overlay `other` onto `self`; top-level keys in `other` win.
    pub fn merge(&mut self, other: TelemetryConfig) {
        self.root.extend(other.root);
    }

    /// Look up a dotted key such as `statsd.host`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut value = self.root.get(parts.next()?)?;
        for part in parts {
            value = value.as_object()?.get(part)?;
        }
        Some(value)
    }

    /// Look up a dotted key and deserialise it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match T::deserialize(value) {
            Ok(v) => Some(v),
            Err(err) => {
                log::warn!("configuration key {key} has unexpected type: {err}");
                None
            }
        }
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Ports may be written as numbers or numeric strings.
    fn get_port(&self, key: &str) -> Option<u16> {
        match self.get(key)? {
            Value::String(s) => s.parse().ok(),
            other => u16::deserialize(other).ok(),
        }
    }
}

/// Wire protocol used by the stats connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StatsProtocol {
    #[default]
    Udp,
    Tcp,
    /// Unrecognised protocol name; stats emission is disabled.
    Other(String),
}

impl FromStr for StatsProtocol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "udp" => Self::Udp,
            "tcp" => Self::Tcp,
            _ => Self::Other(s.to_owned()),
        })
    }
}

impl fmt::Display for StatsProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Udp => f.write_str("udp"),
            Self::Tcp => f.write_str("tcp"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Endpoint for the stats collector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsdSettings {
    pub host: String,
    pub port: u16,
    pub protocol: StatsProtocol,
}

impl StatsdSettings {
    pub fn new(host: impl Into<String>, port: u16, protocol: StatsProtocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
        }
    }

    /// Extract stats settings; `None` when `statsd.host` is not configured.
    pub fn from_config(config: &TelemetryConfig) -> Option<Self> {
        let host = config.get_str("statsd.host")?;
        if host.is_empty() {
            return None;
        }
        let port = config
            .get_port("statsd.port")
            .unwrap_or(DEFAULT_STATSD_PORT);
        let protocol = config
            .get_str("statsd.protocol")
            .map(|p| p.parse::<StatsProtocol>().unwrap_or_default())
            .unwrap_or_default();
        Some(Self::new(host, port, protocol))
    }
}

/// Transport used to ship log events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogProtocol {
    #[default]
    Udp,
    Tcp,
}

/// Split an optional `:port` suffix off `raw`.
///
/// Bare IPv6 literals contain several colons and are returned whole;
/// bracketed literals lose their brackets.
fn split_host_port(raw: &str) -> (&str, Option<u16>) {
    if let Some(rest) = raw.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, "")) => (host, None),
            Some((host, tail)) => match tail.strip_prefix(':').map(str::parse::<u16>) {
                Some(Ok(port)) => (host, Some(port)),
                _ => (raw, None),
            },
            None => (raw, None),
        };
    }
    match raw.split_once(':') {
        Some((host, port)) if !port.contains(':') => match port.parse::<u16>() {
            Ok(port) => (host, Some(port)),
            Err(_) => (raw, None),
        },
        _ => (raw, None),
    }
}

/// Endpoint and options for the remote log collector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingSettings {
    pub host: String,
    pub port: u16,
    pub protocol: LogProtocol,
    /// PEM CA bundle; when set the TCP transport is wrapped in TLS.
    pub ssl_ca_file: Option<PathBuf>,
    /// Minimum level forwarded by the `log` bridge.
    pub level: Level,
}

impl LoggingSettings {
    /// Extract log shipping settings; `None` when no host or port is known.
    ///
    /// `logging.host` may carry the port (`logs.internal:5140`, or
    /// `[::1]:5140` for IPv6 literals); an explicit `logging.port` takes
    /// precedence.
    pub fn from_config(config: &TelemetryConfig) -> Option<Self> {
        let (host, inline_port) = split_host_port(config.get_str("logging.host")?);
        if host.is_empty() {
            return None;
        }
        let Some(port) = config.get_port("logging.port").or(inline_port) else {
            log::warn!("logging.host is set but no port is configured; remote logging disabled");
            return None;
        };
        let protocol = match config.get_str("logging.protocol") {
            Some(p) if p.eq_ignore_ascii_case("tcp") => LogProtocol::Tcp,
            Some(p) if p.eq_ignore_ascii_case("udp") => LogProtocol::Udp,
            Some(p) => {
                log::warn!("unknown logging.protocol {p:?}; falling back to udp");
                LogProtocol::Udp
            }
            None => LogProtocol::Udp,
        };
        let ssl_ca_file = config.get_str("logging.ssl_ca_file").map(PathBuf::from);
        let level = config
            .get_str("logging.level")
            .map(Level::parse_or_info)
            .unwrap_or_default();
        Some(Self {
            host: host.to_owned(),
            port,
            protocol,
            ssl_ca_file,
            level,
        })
    }
}
