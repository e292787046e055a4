//! Loading configuration from the `CLAY_CONFIG` search path.

use std::fs;

use clay_telemetry::{
    LogProtocol, LoggingSettings, StatsdSettings, TelemetryConfig, config::CONFIG_PATH_ENV,
};
use rstest::rstest;
use serial_test::serial;

struct EnvGuard;

impl EnvGuard {
    fn set(value: &str) -> Self {
        // SAFETY: tests touching the environment are serialised.
        unsafe { std::env::set_var(CONFIG_PATH_ENV, value) };
        Self
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests touching the environment are serialised.
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
    }
}

#[rstest]
#[serial]
fn env_search_path_merges_files_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let base = dir.path().join("base.json");
    let local = dir.path().join("local.json");
    fs::write(&base, r#"{"statsd": {"host": "stats"}, "logging": {"host": "logs:5140"}}"#)
        .expect("write base");
    fs::write(&local, r#"{"logging": {"host": "logs-local", "port": 6000, "protocol": "tcp"}}"#)
        .expect("write local");
    let _guard = EnvGuard::set(&format!(
        "{}:{}:{}",
        base.display(),
        dir.path().join("absent.json").display(),
        local.display()
    ));

    let config = TelemetryConfig::from_env().expect("config loads");
    let stats = StatsdSettings::from_config(&config).expect("stats settings");
    assert_eq!(stats.host, "stats");
    let logging = LoggingSettings::from_config(&config).expect("logging settings");
    assert_eq!(logging.host, "logs-local");
    assert_eq!(logging.port, 6000);
    assert_eq!(logging.protocol, LogProtocol::Tcp);
}

#[rstest]
#[serial]
fn unset_search_path_yields_empty_config() {
    // SAFETY: tests touching the environment are serialised.
    unsafe { std::env::remove_var(CONFIG_PATH_ENV) };
    let config = TelemetryConfig::from_env().expect("config loads");
    assert_eq!(config, TelemetryConfig::default());
}
