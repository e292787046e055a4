//! Drop warnings are rate limited and routed through the `log` facade.

use clay_telemetry::{StatsConnection, StatsProtocol, StatsdSettings};
use logtest::Logger;

#[test]
fn unknown_protocol_warns_once_per_interval() {
    let mut logger = Logger::start();
    let connection = StatsConnection::new(Some(StatsdSettings::new(
        "127.0.0.1",
        8125,
        StatsProtocol::Other("sctp".into()),
    )));

    assert!(!connection.send("foo:1|c"));
    let record = logger.pop().expect("warning emitted");
    assert_eq!(record.level(), log::Level::Warn);
    assert!(record.args().contains("unknown protocol"), "{}", record.args());

    assert!(!connection.send("foo:1|c"));
    assert!(logger.pop().is_none(), "second warning should be suppressed");
    assert_eq!(connection.dropped(), 2);
}
