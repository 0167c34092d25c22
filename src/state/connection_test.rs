use super::*;

// =============================================================
// ConnectionState transitions
// =============================================================

#[test]
fn default_state_is_disconnected_with_no_history() {
    let state = ConnectionState::default();
    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert!(state.last_connected_at.is_none());
    assert!(state.last_error.is_none());
    assert_eq!(state.attempt, 0);
}

#[test]
fn probe_succeeded_records_time_and_clears_failure_bookkeeping() {
    let mut state = ConnectionState::default();
    state.begin_attempt(4);
    state.probe_failed("connrefused".to_owned());

    state.probe_succeeded(1_000.0);

    assert_eq!(state.status, ConnectionStatus::Connected);
    assert_eq!(state.last_connected_at, Some(1_000.0));
    assert!(state.last_error.is_none());
    assert_eq!(state.attempt, 0);
}

#[test]
fn probe_failed_drops_a_connected_state() {
    let mut state = ConnectionState::default();
    state.probe_succeeded(1.0);

    state.probe_failed("timeout".to_owned());

    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert_eq!(state.last_error.as_deref(), Some("timeout"));
    // The last successful contact stays on record.
    assert_eq!(state.last_connected_at, Some(1.0));
}

#[test]
fn probe_failed_leaves_a_reconnecting_state_in_place() {
    let mut state = ConnectionState::default();
    state.begin_attempt(2);

    state.probe_failed("connrefused".to_owned());

    assert_eq!(state.status, ConnectionStatus::Reconnecting);
    assert_eq!(state.attempt, 2);
}

#[test]
fn give_up_moves_to_disconnected() {
    let mut state = ConnectionState::default();
    state.begin_attempt(10);
    state.give_up();
    assert_eq!(state.status, ConnectionStatus::Disconnected);
}

#[test]
fn force_offline_overrides_any_status() {
    let mut state = ConnectionState::default();
    state.probe_succeeded(5.0);

    state.force_offline("network offline");

    assert_eq!(state.status, ConnectionStatus::Disconnected);
    assert_eq!(state.last_error.as_deref(), Some("network offline"));
}

#[test]
fn is_connected_only_while_connected() {
    let mut state = ConnectionState::default();
    assert!(!state.is_connected());
    state.begin_attempt(1);
    assert!(!state.is_connected());
    state.probe_succeeded(0.0);
    assert!(state.is_connected());
}

// =============================================================
// Backoff schedule
// =============================================================

#[test]
fn backoff_doubles_from_one_second() {
    assert_eq!(backoff_delay_ms(1), 1000);
    assert_eq!(backoff_delay_ms(2), 2000);
    assert_eq!(backoff_delay_ms(3), 4000);
    assert_eq!(backoff_delay_ms(4), 8000);
    assert_eq!(backoff_delay_ms(5), 16_000);
}

#[test]
fn backoff_is_capped_at_thirty_seconds() {
    assert_eq!(backoff_delay_ms(6), 30_000);
    assert_eq!(backoff_delay_ms(10), 30_000);
    assert_eq!(backoff_delay_ms(u32::MAX), 30_000);
}

#[test]
fn jitter_stays_under_one_second() {
    assert_eq!(with_jitter(1000, 0.0), 1000);
    assert_eq!(with_jitter(1000, 0.5), 1500);
    // The unit is exclusive of 1.0, and clamping keeps hostile inputs
    // inside the window.
    assert!(with_jitter(1000, 0.999_999) < 2000);
    assert!(with_jitter(1000, 2.0) < 2000);
    assert_eq!(with_jitter(1000, -1.0), 1000);
}

#[test]
fn jittered_delay_never_exceeds_thirty_one_seconds() {
    for attempt in 1..=MAX_ATTEMPTS {
        assert!(with_jitter(backoff_delay_ms(attempt), 0.999_999) < 31_000);
    }
}

// =============================================================
// Reconnect walk: three failures then success
// =============================================================

#[test]
fn failed_attempts_count_up_and_success_resets() {
    let mut state = ConnectionState::default();

    for (attempt, expected_delay) in [(1, 1000), (2, 2000), (3, 4000)] {
        state.begin_attempt(attempt);
        assert_eq!(state.status, ConnectionStatus::Reconnecting);
        assert_eq!(state.attempt, attempt);
        state.probe_failed("connrefused".to_owned());
        assert_eq!(backoff_delay_ms(attempt), expected_delay);
    }

    state.begin_attempt(4);
    state.probe_succeeded(99.0);

    assert_eq!(state.status, ConnectionStatus::Connected);
    assert_eq!(state.attempt, 0);
    assert!(state.last_error.is_none());
}
