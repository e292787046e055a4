//! Send/Sync guarantees for the shared transport types.

use clay_telemetry::{
    DatagramLogHandler, ShipperBuilder, SocketShipper, StatsClient, StatsConnection,
    TelemetryConfig, TelemetryHandler,
};
use rstest::rstest;
use static_assertions::{assert_impl_all, assert_obj_safe};

#[rstest]
fn transports_are_send_sync() {
    assert_impl_all!(StatsConnection: Send, Sync);
    assert_impl_all!(StatsClient: Send, Sync);
    assert_impl_all!(SocketShipper: Send, Sync);
    assert_impl_all!(DatagramLogHandler: Send, Sync);
}

#[rstest]
fn builders_and_config_are_send_sync() {
    assert_impl_all!(ShipperBuilder: Send, Sync, Clone);
    assert_impl_all!(TelemetryConfig: Send, Sync, Clone);
}

assert_obj_safe!(TelemetryHandler);
