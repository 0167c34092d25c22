//! Connection resilience manager: health probing and backoff reconnection.
//!
//! The manager owns [`ConnectionState`] exclusively. It probes `/api/health`
//! once at mount, polls on a fixed cadence while connected to catch silent
//! drops, and drives a bounded exponential-backoff loop while disconnected.
//! Browser signals (tab became visible, window focused, network back online)
//! restart reconnection immediately instead of waiting out the schedule.
//!
//! All browser glue is gated behind `#[cfg(feature = "hydrate")]`.
//!
//! ERROR HANDLING
//! ==============
//! A failed probe is never fatal: it is captured into `last_error` and the
//! next attempt is scheduled per the backoff policy. After the attempt
//! limit is exhausted automatic retries stop; `reconnect()` stays available
//! and restarts the counter.

#[cfg(test)]
#[path = "connection_test.rs"]
mod connection_test;

#[cfg(any(test, feature = "hydrate"))]
use crate::state::connection::ConnectionStatus;

#[cfg(feature = "hydrate")]
use std::cell::{Cell, RefCell};
#[cfg(feature = "hydrate")]
use std::rc::Rc;

#[cfg(feature = "hydrate")]
use leptos::prelude::{GetUntracked, RwSignal, Update};
#[cfg(feature = "hydrate")]
use wasm_bindgen::{JsCast, closure::Closure};

#[cfg(feature = "hydrate")]
use crate::state::connection::{
    ConnectionState, HEALTH_POLL_INTERVAL_MS, MAX_ATTEMPTS, backoff_delay_ms, with_jitter,
};

/// Whether an external wake signal (tab visible, window focus, back online)
/// should restart reconnection. Signals are ignored while connected.
#[cfg(any(test, feature = "hydrate"))]
fn signal_restarts_reconnect(status: ConnectionStatus) -> bool {
    status != ConnectionStatus::Connected
}

/// Whether the periodic health poll may probe. The backoff loop owns probing
/// in every other status, so poll and backoff never race a probe.
#[cfg(any(test, feature = "hydrate"))]
fn poll_may_probe(status: ConnectionStatus) -> bool {
    status == ConnectionStatus::Connected
}

/// Run a single health probe and fold the outcome into `conn`.
///
/// Never fails; probe errors are captured into state.
#[cfg(feature = "hydrate")]
pub async fn check_connection(conn: RwSignal<ConnectionState>) -> bool {
    match crate::net::api::probe_health().await {
        Ok(()) => {
            conn.update(|c| c.probe_succeeded(js_sys::Date::now()));
            true
        }
        Err(e) => {
            leptos::logging::warn!("health probe failed: {e}");
            conn.update(|c| c.probe_failed(e.to_string()));
            false
        }
    }
}

/// Removes its DOM listener when dropped, so listener registration and
/// cleanup cannot drift apart.
#[cfg(feature = "hydrate")]
struct ListenerGuard {
    target: web_sys::EventTarget,
    event: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

#[cfg(feature = "hydrate")]
impl ListenerGuard {
    fn attach(
        target: &web_sys::EventTarget,
        event: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Option<Self> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .ok()?;
        Some(Self {
            target: target.clone(),
            event,
            closure,
        })
    }
}

#[cfg(feature = "hydrate")]
impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.closure.as_ref().unchecked_ref());
    }
}

#[cfg(feature = "hydrate")]
struct ManagerInner {
    conn: RwSignal<ConnectionState>,
    /// Monotonic run counter. Bumping it orphans every sleeping backoff
    /// loop, so at most one scheduled retry chain is ever live.
    epoch: Cell<u64>,
    alive: Cell<bool>,
    listeners: RefCell<Vec<ListenerGuard>>,
}

/// Handle to the running resilience manager. Cheap to clone; share it with
/// anything that needs the manual [`reconnect`](Self::reconnect) entry point.
///
/// Call [`shutdown`](Self::shutdown) at component teardown: it cancels the
/// poll loop and any scheduled retry and detaches all DOM listeners.
#[cfg(feature = "hydrate")]
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Rc<ManagerInner>,
}

#[cfg(feature = "hydrate")]
impl ConnectionManager {
    /// Start the manager: one immediate reconnect pass, the 30-second health
    /// poll, and the browser signal listeners.
    pub fn mount(conn: RwSignal<ConnectionState>) -> Self {
        let manager = Self {
            inner: Rc::new(ManagerInner {
                conn,
                epoch: Cell::new(0),
                alive: Cell::new(true),
                listeners: RefCell::new(Vec::new()),
            }),
        };

        manager.attach_signal_listeners();

        let initially_online = web_sys::window().is_none_or(|w| w.navigator().on_line());
        if initially_online {
            manager.restart();
        } else {
            conn.update(|c| c.force_offline("network offline"));
        }

        let poll = manager.clone();
        leptos::task::spawn_local(async move {
            poll.run_health_poll().await;
        });

        manager
    }

    /// The state signal this manager writes. Consumers read, never write.
    #[must_use]
    pub fn state(&self) -> RwSignal<ConnectionState> {
        self.inner.conn
    }

    /// Manual reconnect: cancel any scheduled retry, reset the attempt
    /// counter, and start a fresh backoff run immediately.
    pub fn reconnect(&self) {
        self.restart();
    }

    /// A send failed at the network level while we thought we were
    /// connected; re-check reachability. No-op when the manager is already
    /// reconnecting or down (the backoff loop owns the situation then).
    pub fn request_recheck(&self) {
        if self.inner.conn.get_untracked().is_connected() {
            self.restart();
        }
    }

    /// Stop the poll loop, orphan any scheduled retry, and detach all DOM
    /// listeners. The handle is inert afterwards.
    pub fn shutdown(&self) {
        self.inner.alive.set(false);
        self.inner.epoch.set(self.inner.epoch.get() + 1);
        self.inner.listeners.borrow_mut().clear();
    }

    fn restart(&self) {
        if !self.inner.alive.get() {
            return;
        }
        let epoch = self.inner.epoch.get() + 1;
        self.inner.epoch.set(epoch);
        let runner = self.clone();
        leptos::task::spawn_local(async move {
            runner.run_backoff(epoch).await;
        });
    }

    /// Bounded backoff loop: probe, then wait `min(1000 * 2^(n-1), 30s)`
    /// plus jitter before attempt `n + 1`, giving up after [`MAX_ATTEMPTS`].
    async fn run_backoff(&self, epoch: u64) {
        let inner = &self.inner;
        let mut attempt = 1u32;
        loop {
            if !inner.alive.get() || inner.epoch.get() != epoch {
                return;
            }
            if attempt > MAX_ATTEMPTS {
                leptos::logging::warn!("giving up after {MAX_ATTEMPTS} reconnect attempts");
                inner.conn.update(ConnectionState::give_up);
                return;
            }
            inner.conn.update(|c| c.begin_attempt(attempt));
            if check_connection(inner.conn).await {
                return;
            }
            let delay = with_jitter(backoff_delay_ms(attempt), js_sys::Math::random());
            gloo_timers::future::sleep(std::time::Duration::from_millis(delay)).await;
            attempt += 1;
        }
    }

    /// Silent-drop detector: probe on a fixed cadence while connected. A
    /// failed probe hands over to the backoff loop when the page is visible.
    async fn run_health_poll(&self) {
        let inner = &self.inner;
        loop {
            gloo_timers::future::sleep(std::time::Duration::from_millis(HEALTH_POLL_INTERVAL_MS))
                .await;
            if !inner.alive.get() {
                return;
            }
            if !poll_may_probe(inner.conn.get_untracked().status) {
                continue;
            }
            if !check_connection(inner.conn).await && document_is_visible() {
                self.restart();
            }
        }
    }

    fn attach_signal_listeners(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let mut guards = Vec::new();

        if let Some(document) = window.document() {
            let visible = self.clone();
            let guard = ListenerGuard::attach(&document, "visibilitychange", move |_| {
                let status = visible.inner.conn.get_untracked().status;
                if document_is_visible() && signal_restarts_reconnect(status) {
                    visible.restart();
                }
            });
            guards.extend(guard);
        }

        let focus = self.clone();
        guards.extend(ListenerGuard::attach(&window, "focus", move |_| {
            if signal_restarts_reconnect(focus.inner.conn.get_untracked().status) {
                focus.restart();
            }
        }));

        let online = self.clone();
        guards.extend(ListenerGuard::attach(&window, "online", move |_| {
            if signal_restarts_reconnect(online.inner.conn.get_untracked().status) {
                online.restart();
            }
        }));

        let offline = self.clone();
        guards.extend(ListenerGuard::attach(&window, "offline", move |_| {
            // Drop immediately instead of waiting for the next poll. The
            // backoff loop still self-starts so recovery is automatic.
            offline.inner.epoch.set(offline.inner.epoch.get() + 1);
            offline
                .inner
                .conn
                .update(|c| c.force_offline("network offline"));
            if document_is_visible() {
                offline.restart();
            }
        }));

        self.inner.listeners.borrow_mut().extend(guards);
    }
}

#[cfg(feature = "hydrate")]
fn document_is_visible() -> bool {
    web_sys::window()
        .and_then(|w| w.document())
        .is_none_or(|d| d.visibility_state() == web_sys::VisibilityState::Visible)
}
