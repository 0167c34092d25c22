//! Backend reachability state and the reconnection backoff policy.
//!
//! DESIGN
//! ======
//! `ConnectionState` is the single source of truth for "can we reach the
//! backend". Only the connection manager (`crate::net::connection`) writes
//! it; every other module reads. The backoff math lives here as pure
//! functions so the retry schedule is testable without a browser.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

/// Reachability of the chat backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// The last health probe succeeded.
    Connected,
    /// Not reachable and no retry currently running.
    #[default]
    Disconnected,
    /// A backoff-driven reconnect attempt is in progress.
    Reconnecting,
}

/// Connection state owned by the connection manager.
///
/// Read-only to consumers; transitions happen through the methods below.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConnectionState {
    /// Current reachability.
    pub status: ConnectionStatus,
    /// Milliseconds since the Unix epoch of the last successful probe.
    pub last_connected_at: Option<f64>,
    /// Most recent probe failure, if any.
    pub last_error: Option<String>,
    /// Current reconnect attempt number; 0 while connected or idle.
    pub attempt: u32,
}

impl ConnectionState {
    /// Fold a successful health probe into the state.
    ///
    /// Clears any failure bookkeeping and ends an in-flight reconnect run.
    pub fn probe_succeeded(&mut self, now_ms: f64) {
        self.status = ConnectionStatus::Connected;
        self.last_connected_at = Some(now_ms);
        self.last_error = None;
        self.attempt = 0;
    }

    /// Fold a failed health probe into the state.
    ///
    /// A silent drop while `Connected` moves to `Disconnected`; a probe that
    /// fails mid-backoff leaves `Reconnecting` in place so the status
    /// indicator does not flap once per retry.
    pub fn probe_failed(&mut self, error: String) {
        self.last_error = Some(error);
        if self.status == ConnectionStatus::Connected {
            self.status = ConnectionStatus::Disconnected;
        }
    }

    /// Mark the start of reconnect attempt `attempt` (1-based).
    pub fn begin_attempt(&mut self, attempt: u32) {
        self.status = ConnectionStatus::Reconnecting;
        self.attempt = attempt;
    }

    /// Automatic retries are exhausted; stay down until a manual reconnect
    /// or an external signal restarts the loop.
    pub fn give_up(&mut self) {
        self.status = ConnectionStatus::Disconnected;
    }

    /// The platform reported the network went away; drop immediately without
    /// waiting for the next probe.
    pub fn force_offline(&mut self, reason: impl Into<String>) {
        self.status = ConnectionStatus::Disconnected;
        self.last_error = Some(reason.into());
    }

    /// Whether sends may be issued right now.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

/// Automatic reconnect attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 10;
/// Delay before the second attempt; doubles per attempt after that.
pub const BASE_DELAY_MS: u64 = 1000;
/// Ceiling on the pre-jitter delay.
pub const MAX_DELAY_MS: u64 = 30_000;
/// Upper bound (exclusive) of the random jitter added to every delay.
pub const JITTER_MS: u64 = 1000;
/// Cadence of the silent-drop health poll while connected.
pub const HEALTH_POLL_INTERVAL_MS: u64 = 30_000;

/// Pre-jitter backoff delay for reconnect attempt `attempt` (1-based):
/// `min(1000 * 2^(attempt - 1), 30_000)`.
#[must_use]
pub fn backoff_delay_ms(attempt: u32) -> u64 {
    let exp = attempt.saturating_sub(1);
    if exp >= 6 {
        return MAX_DELAY_MS;
    }
    (BASE_DELAY_MS << exp).min(MAX_DELAY_MS)
}

/// Apply jitter to a backoff delay. `unit` is a uniform random value in
/// `[0, 1)` (injected so the schedule stays deterministic under test).
#[must_use]
pub fn with_jitter(delay_ms: u64, unit: f64) -> u64 {
    let jitter = (unit.clamp(0.0, 1.0) * JITTER_MS as f64) as u64;
    delay_ms + jitter.min(JITTER_MS.saturating_sub(1))
}
