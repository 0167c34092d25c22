use super::*;

#[test]
fn wake_signals_restart_unless_connected() {
    assert!(signal_restarts_reconnect(ConnectionStatus::Disconnected));
    assert!(signal_restarts_reconnect(ConnectionStatus::Reconnecting));
    assert!(!signal_restarts_reconnect(ConnectionStatus::Connected));
}

#[test]
fn poll_probes_only_while_connected() {
    assert!(poll_may_probe(ConnectionStatus::Connected));
    assert!(!poll_may_probe(ConnectionStatus::Disconnected));
    assert!(!poll_may_probe(ConnectionStatus::Reconnecting));
}

#[test]
fn poll_and_backoff_never_probe_in_the_same_status() {
    for status in [
        ConnectionStatus::Connected,
        ConnectionStatus::Disconnected,
        ConnectionStatus::Reconnecting,
    ] {
        assert_ne!(poll_may_probe(status), signal_restarts_reconnect(status));
    }
}
