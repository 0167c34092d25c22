//! Chat message pipeline: optimistic sends, timeout race, history sync, and
//! speculative model warmup.
//!
//! DESIGN
//! ======
//! `send_message` appends the user's bubble before the network call and
//! races the call against a cooperative timeout; whichever side loses
//! resolves against a stale token inside [`ChatState`] and becomes a no-op,
//! so a late response can never append a duplicate assistant message.
//! Reconnection is delegated entirely to the connection manager; this
//! module only nudges it when a send fails at the network level.
//!
//! ERROR HANDLING
//! ==============
//! A failed send never escapes as a crash: it always lands in the transcript
//! as an error bubble with category-specific copy, plus a typed error return
//! for callers that react (e.g. keep the input box populated).

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;

use crate::net::types::ApiError;

#[cfg(any(test, feature = "hydrate"))]
use crate::net::types::{ChatResponse, HistoryRecord};
#[cfg(any(test, feature = "hydrate"))]
use crate::state::chat::{Message, Role, WarmupState};

#[cfg(feature = "hydrate")]
use leptos::prelude::{GetUntracked, RwSignal, Update};

#[cfg(feature = "hydrate")]
use crate::net::connection::ConnectionManager;
#[cfg(feature = "hydrate")]
use crate::state::chat::ChatState;

/// Cooperative cancellation window for one send.
pub const SEND_TIMEOUT_MS: u64 = 300_000;
/// Typing-inactivity window before a warmup call fires.
pub const WARMUP_DEBOUNCE_MS: u64 = 500;
/// Minimum typed characters before warmup is worth scheduling.
pub const WARMUP_MIN_CHARS: usize = 2;
/// History page size requested on load.
pub const HISTORY_PAGE_SIZE: u32 = 50;

/// Why a send was rejected up front or failed in flight.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// Content was empty after trimming; nothing was sent or appended.
    #[error("message is empty")]
    EmptyMessage,
    /// Another send is still in flight.
    #[error("another send is in flight")]
    SendInFlight,
    /// The connection manager does not consider the backend reachable.
    #[error("backend is not reachable")]
    NotConnected,
    /// The call was issued and failed; an error bubble was appended.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Normalize raw input for sending. `None` means the send is a no-op.
#[cfg(any(test, feature = "hydrate"))]
fn prepare_content(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

/// Freshly generated id for locally created messages.
#[must_use]
pub fn local_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// User-facing copy for a failed send, by failure category.
#[cfg(any(test, feature = "hydrate"))]
fn failure_explanation(error: &ApiError) -> String {
    match error {
        ApiError::Timeout(_) => {
            "The assistant took too long to respond. Please try again.".to_owned()
        }
        ApiError::NetworkUnreachable(_) => {
            "Connection to the assistant was lost. Reconnecting...".to_owned()
        }
        ApiError::ServerError(_) => {
            "The assistant service is having issues. Please retry shortly.".to_owned()
        }
        ApiError::ClientError(_) | ApiError::Unknown(_) => {
            "The assistant encountered an error. Please try again.".to_owned()
        }
    }
}

/// Build the transcript entry for a successful reply.
///
/// `timestamp_ms` is the parsed server timestamp; `fallback_now_ms` is used
/// when the server string did not parse.
#[cfg(any(test, feature = "hydrate"))]
fn assistant_message_from_response(
    resp: &ChatResponse,
    timestamp_ms: Option<f64>,
    fallback_now_ms: f64,
) -> Message {
    Message {
        id: resp.message_id.clone(),
        role: Role::Assistant,
        content: resp.response.clone(),
        created_at: timestamp_ms.unwrap_or(fallback_now_ms),
        model: Some(resp.model.clone()),
        provider: Some(resp.provider.clone()),
    }
}

/// Map one history record into a transcript entry.
///
/// History rows carry no model/provider attribution.
#[cfg(any(test, feature = "hydrate"))]
fn message_from_history_record(record: &HistoryRecord, timestamp_ms: f64) -> Message {
    Message {
        id: record.id.clone(),
        role: Role::from_message_type(&record.message_type),
        content: record.content.clone(),
        created_at: timestamp_ms,
        model: None,
        provider: None,
    }
}

/// Whether a warmup call should be scheduled for the current input.
#[cfg(any(test, feature = "hydrate"))]
fn should_schedule_warmup(input: &str, warmup: WarmupState) -> bool {
    input.chars().count() > WARMUP_MIN_CHARS && !warmup.has_warmed && !warmup.is_warming
}

/// Debounce handle for warmup scheduling. Each keystroke bumps the
/// generation; a sleeper that wakes with a stale generation does nothing,
/// so only the last pause of [`WARMUP_DEBOUNCE_MS`] fires.
#[derive(Clone, Debug, Default)]
pub struct WarmupDebounce {
    generation: std::rc::Rc<std::cell::Cell<u64>>,
}

impl WarmupDebounce {
    /// Invalidate any scheduled warmup and return the new generation.
    pub fn bump(&self) -> u64 {
        let next = self.generation.get() + 1;
        self.generation.set(next);
        next
    }

    /// Generation that is currently allowed to fire.
    #[must_use]
    pub fn current(&self) -> u64 {
        self.generation.get()
    }

    /// Cancel any scheduled warmup without scheduling a new one.
    pub fn cancel(&self) {
        self.bump();
    }
}

/// Send one message and append the reply (or an error bubble).
///
/// Appends the optimistic user bubble immediately, then races the backend
/// call against the [`SEND_TIMEOUT_MS`] window. Exactly one of the two
/// outcomes resolves the turn; the loser is discarded.
///
/// # Errors
///
/// [`SendError::EmptyMessage`], [`SendError::SendInFlight`] and
/// [`SendError::NotConnected`] reject the send with no transcript change and
/// no network call (`NotConnected` also asks the manager to re-check).
/// [`SendError::Api`] reports an issued call that failed; the error bubble
/// is already in the transcript when it is returned.
#[cfg(feature = "hydrate")]
pub async fn send_message(
    chat: RwSignal<ChatState>,
    manager: &ConnectionManager,
    content: &str,
    user_id: &str,
) -> Result<Message, SendError> {
    let Some(content) = prepare_content(content) else {
        return Err(SendError::EmptyMessage);
    };
    let status = manager.state().get_untracked().status;
    if status != crate::state::connection::ConnectionStatus::Connected {
        // Nudge a dead manager back to life; a live backoff loop already
        // owns the situation.
        if status == crate::state::connection::ConnectionStatus::Disconnected {
            manager.reconnect();
        }
        return Err(SendError::NotConnected);
    }

    let mut token = None;
    chat.update(|c| token = c.begin_send());
    let Some(token) = token else {
        return Err(SendError::SendInFlight);
    };

    chat.update(|c| {
        c.push_user_message(local_message_id(), content.clone(), js_sys::Date::now());
    });

    let request = Box::pin(crate::net::api::send_chat_message(&content, user_id));
    let timeout = Box::pin(gloo_timers::future::sleep(std::time::Duration::from_millis(
        SEND_TIMEOUT_MS,
    )));

    let outcome = match futures::future::select(request, timeout).await {
        futures::future::Either::Left((result, _timeout)) => result,
        // The window elapsed first; dropping the request future cancels it
        // and the stale token swallows any late resolution.
        futures::future::Either::Right(((), _request)) => Err(ApiError::Timeout(SEND_TIMEOUT_MS)),
    };

    match outcome {
        Ok(resp) => {
            let parsed = parse_timestamp_ms(&resp.timestamp);
            let message = assistant_message_from_response(&resp, parsed, js_sys::Date::now());
            chat.update(|c| {
                c.resolve_send(token, message.clone());
            });
            Ok(message)
        }
        Err(error) => {
            leptos::logging::warn!("send failed: {error}");
            chat.update(|c| {
                c.fail_send(
                    token,
                    local_message_id(),
                    failure_explanation(&error),
                    js_sys::Date::now(),
                );
            });
            if error.is_connection_loss() {
                manager.request_recheck();
            }
            Err(SendError::Api(error))
        }
    }
}

/// Replace the transcript with server history.
///
/// On failure the existing transcript is left untouched; the error is
/// recorded for an optional banner.
#[cfg(feature = "hydrate")]
pub async fn load_history(chat: RwSignal<ChatState>, user_id: &str) {
    chat.update(|c| c.history_loading = true);
    match crate::net::api::fetch_history(user_id, HISTORY_PAGE_SIZE, 0).await {
        Ok(records) => {
            let messages = records
                .iter()
                .map(|record| {
                    let ts = parse_timestamp_ms(&record.timestamp).unwrap_or_else(js_sys::Date::now);
                    message_from_history_record(record, ts)
                })
                .collect();
            chat.update(|c| c.replace_history(messages));
        }
        Err(error) => {
            leptos::logging::warn!("history load failed: {error}");
            chat.update(|c| {
                c.history_loading = false;
                c.last_error = Some(error.to_string());
            });
        }
    }
}

/// Clear history on the server, then locally (only on success).
///
/// # Errors
///
/// Returns the [`ApiError`] when the server-side delete fails; the local
/// transcript is preserved in that case.
#[cfg(feature = "hydrate")]
pub async fn clear_history(chat: RwSignal<ChatState>, user_id: &str) -> Result<(), ApiError> {
    match crate::net::api::clear_history(user_id).await {
        Ok(()) => {
            chat.update(ChatState::clear);
            Ok(())
        }
        Err(error) => {
            leptos::logging::warn!("history clear failed: {error}");
            chat.update(|c| c.last_error = Some(error.to_string()));
            Err(error)
        }
    }
}

/// Note a keystroke and maybe schedule a warmup call.
///
/// Fires at most once per turn, after [`WARMUP_DEBOUNCE_MS`] of typing
/// inactivity. The call is best-effort: its outcome only toggles
/// `is_warming` for UI feedback and marks the turn as warmed.
#[cfg(feature = "hydrate")]
pub fn trigger_warmup(chat: RwSignal<ChatState>, debounce: &WarmupDebounce, input: &str) {
    // Every keystroke invalidates the previously scheduled timer, even when
    // the new input no longer qualifies.
    let generation = debounce.bump();
    if !should_schedule_warmup(input, chat.get_untracked().warmup) {
        return;
    }
    let debounce = debounce.clone();
    leptos::task::spawn_local(async move {
        gloo_timers::future::sleep(std::time::Duration::from_millis(WARMUP_DEBOUNCE_MS)).await;
        if debounce.current() != generation {
            return;
        }
        let warmup = chat.get_untracked().warmup;
        if warmup.has_warmed || warmup.is_warming {
            return;
        }
        chat.update(|c| c.warmup.is_warming = true);
        if let Err(error) = crate::net::api::send_warmup().await {
            leptos::logging::log!("warmup skipped: {error}");
        }
        chat.update(|c| {
            c.warmup.is_warming = false;
            c.warmup.has_warmed = true;
        });
    });
}

/// Parse an ISO 8601 server timestamp into epoch milliseconds.
#[cfg(feature = "hydrate")]
fn parse_timestamp_ms(timestamp: &str) -> Option<f64> {
    let ms = js_sys::Date::parse(timestamp);
    if ms.is_nan() { None } else { Some(ms) }
}
