//! Queued socket transport for the optional persistent connection.
//!
//! DESIGN
//! ======
//! [`SocketQueue`] is the authoritative state machine: messages sent while
//! the socket is not open are buffered and flushed strictly in enqueue order
//! once it opens; a close preserves the buffer so a reconnect resumes the
//! flush, and only an explicit [`SocketQueue::reset`] drops stale entries.
//! The websocket lifecycle glue reuses the connection manager's backoff
//! policy between dials rather than inventing its own schedule.
//!
//! ERROR HANDLING
//! ==============
//! Transport failures never drop messages silently: a write that fails puts
//! the message back in the buffer, and the loop reconnects with backoff.

#[cfg(test)]
#[path = "socket_client_test.rs"]
mod socket_client_test;

use std::collections::VecDeque;

/// Socket lifecycle as seen by the queueing layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SocketStatus {
    /// Dialing; not yet usable.
    #[default]
    Connecting,
    /// Open and transmitting.
    Open,
    /// Closed; sends are buffered until the next open.
    Closed,
}

/// What the transport should do with one outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendDisposition {
    /// Socket is open; put the message on the wire now.
    Transmit(String),
    /// Socket is not open; the message was buffered.
    Buffered,
}

/// Outbound queue and inbound observation point for the socket transport.
#[derive(Clone, Debug, Default)]
pub struct SocketQueue {
    status: SocketStatus,
    buffer: VecDeque<String>,
    /// Most recent inbound frame, for subscribers.
    pub last_message: Option<String>,
}

impl SocketQueue {
    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> SocketStatus {
        self.status
    }

    /// Messages currently waiting for an open socket.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Route one outbound message: straight to the wire when open,
    /// otherwise into the buffer.
    pub fn send(&mut self, message: String) -> SendDisposition {
        if self.status == SocketStatus::Open {
            SendDisposition::Transmit(message)
        } else {
            self.buffer.push_back(message);
            SendDisposition::Buffered
        }
    }

    /// Note a fresh dial.
    pub fn mark_connecting(&mut self) {
        self.status = SocketStatus::Connecting;
    }

    /// Note an open socket. Returns the buffered backlog in enqueue order;
    /// the caller transmits it before anything else.
    pub fn mark_open(&mut self) -> Vec<String> {
        self.status = SocketStatus::Open;
        self.buffer.drain(..).collect()
    }

    /// Note a closed socket. The buffer is preserved so a later reconnect
    /// resumes flushing.
    pub fn mark_closed(&mut self) {
        self.status = SocketStatus::Closed;
    }

    /// Put a message that could not be transmitted back at the front of the
    /// buffer, ahead of anything queued since.
    pub fn requeue(&mut self, message: String) {
        self.buffer.push_front(message);
    }

    /// Put an unsent tail of a backlog flush back, preserving order.
    pub fn restore_front(&mut self, unsent: Vec<String>) {
        for message in unsent.into_iter().rev() {
            self.buffer.push_front(message);
        }
    }

    /// Drop all buffered messages. The only way stale entries disappear;
    /// callers opt in before a fresh session.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Record an inbound frame for subscribers.
    pub fn record_inbound(&mut self, message: String) {
        self.last_message = Some(message);
    }
}

/// Handle to the running socket transport.
#[cfg(feature = "hydrate")]
#[derive(Clone)]
pub struct SocketClient {
    queue: leptos::prelude::RwSignal<SocketQueue>,
    tx: futures::channel::mpsc::UnboundedSender<String>,
    alive: std::rc::Rc<std::cell::Cell<bool>>,
}

#[cfg(feature = "hydrate")]
impl SocketClient {
    /// Spawn the socket lifecycle as a local async task and return the
    /// sending handle. `queue` is the shared transport state consumers
    /// observe.
    pub fn spawn(queue: leptos::prelude::RwSignal<SocketQueue>) -> Self {
        let (tx, rx) = futures::channel::mpsc::unbounded::<String>();
        let alive = std::rc::Rc::new(std::cell::Cell::new(true));
        let loop_alive = alive.clone();
        leptos::task::spawn_local(socket_loop(queue, rx, loop_alive));
        Self { queue, tx, alive }
    }

    /// Send one message, buffering when the socket is not open.
    ///
    /// Returns `false` only when an open socket's channel turned out to be
    /// gone; the message is back in the buffer in that case.
    pub fn send(&self, message: String) -> bool {
        use leptos::prelude::Update;

        let mut disposition = SendDisposition::Buffered;
        self.queue.update(|q| disposition = q.send(message));
        match disposition {
            SendDisposition::Transmit(msg) => {
                if self.tx.unbounded_send(msg.clone()).is_err() {
                    self.queue.update(|q| q.requeue(msg));
                    return false;
                }
                true
            }
            SendDisposition::Buffered => true,
        }
    }

    /// Drop buffered messages before a fresh session.
    pub fn reset(&self) {
        use leptos::prelude::Update;
        self.queue.update(SocketQueue::reset);
    }

    /// Stop reconnecting after the current connection ends.
    pub fn shutdown(&self) {
        self.alive.set(false);
        self.tx.close_channel();
    }
}

/// Websocket URL derived from the page location.
#[cfg(feature = "hydrate")]
fn socket_url() -> String {
    let location = web_sys::window()
        .and_then(|w| w.location().href().ok())
        .unwrap_or_default();
    let proto = if location.starts_with("https") { "wss" } else { "ws" };
    let host = web_sys::window()
        .and_then(|w| w.location().host().ok())
        .unwrap_or_else(|| "localhost:8000".to_owned());
    format!("{proto}://{host}/api/chat/ws")
}

/// Connection loop: dial, flush the backlog, pump frames, and on disconnect
/// wait per the resilience manager's backoff policy before redialing.
#[cfg(feature = "hydrate")]
async fn socket_loop(
    queue: leptos::prelude::RwSignal<SocketQueue>,
    rx: futures::channel::mpsc::UnboundedReceiver<String>,
    alive: std::rc::Rc<std::cell::Cell<bool>>,
) {
    use leptos::prelude::Update;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::state::connection::{backoff_delay_ms, with_jitter};

    let rx = Rc::new(RefCell::new(rx));
    let mut attempt: u32 = 0;

    loop {
        if !alive.get() {
            return;
        }
        queue.update(SocketQueue::mark_connecting);

        match connect_and_pump(&socket_url(), queue, &rx, &mut attempt).await {
            Ok(()) => {
                leptos::logging::log!("socket disconnected cleanly");
            }
            Err(e) => {
                leptos::logging::warn!("socket error: {e}");
                attempt += 1;
            }
        }

        queue.update(SocketQueue::mark_closed);

        let delay = with_jitter(backoff_delay_ms(attempt.max(1)), js_sys::Math::random());
        gloo_timers::future::sleep(std::time::Duration::from_millis(delay)).await;
    }
}

/// Dial the socket and process frames until disconnect.
#[cfg(feature = "hydrate")]
async fn connect_and_pump(
    url: &str,
    queue: leptos::prelude::RwSignal<SocketQueue>,
    rx: &std::rc::Rc<std::cell::RefCell<futures::channel::mpsc::UnboundedReceiver<String>>>,
    attempt: &mut u32,
) -> Result<(), String> {
    use futures::{SinkExt, StreamExt};
    use gloo_net::websocket::Message;
    use gloo_net::websocket::futures::WebSocket;
    use leptos::prelude::Update;

    let ws = WebSocket::open(url).map_err(|e| e.to_string())?;
    let (mut ws_write, mut ws_read) = ws.split();
    *attempt = 0;

    // Flush the backlog in enqueue order before accepting new traffic.
    let mut backlog = Vec::new();
    queue.update(|q| backlog = q.mark_open());
    let mut backlog = backlog.into_iter();
    while let Some(msg) = backlog.next() {
        if ws_write.send(Message::Text(msg.clone())).await.is_err() {
            let mut unsent = vec![msg];
            unsent.extend(backlog);
            queue.update(|q| q.restore_front(unsent));
            return Err("socket closed during backlog flush".to_owned());
        }
    }

    // Forward outgoing messages from the channel to the socket.
    let mut rx_borrow = rx.borrow_mut();
    let send_task = async {
        while let Some(msg) = rx_borrow.next().await {
            if ws_write.send(Message::Text(msg.clone())).await.is_err() {
                queue.update(|q| q.requeue(msg));
                break;
            }
        }
    };

    // Record inbound frames for subscribers.
    let recv_task = async {
        while let Some(frame) = ws_read.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    queue.update(|q| q.record_inbound(text));
                }
                Ok(Message::Bytes(bytes)) => {
                    if let Ok(text) = String::from_utf8(bytes) {
                        queue.update(|q| q.record_inbound(text));
                    }
                }
                Err(e) => {
                    leptos::logging::warn!("socket recv error: {e}");
                    break;
                }
            }
        }
    };

    futures::future::select(Box::pin(send_task), Box::pin(recv_task)).await;

    Ok(())
}
