//! Conversation transcript state and per-turn send bookkeeping.
//!
//! DESIGN
//! ======
//! The transcript is append-only during a session: a failed send appends an
//! error bubble instead of mutating the original user message, and only a
//! history load or an explicit clear replaces the sequence wholesale. At most
//! one send is in flight at a time, tracked by an opaque token so whichever
//! of {response, timeout} loses the race resolves against a stale token and
//! becomes a no-op.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

/// Who authored a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Locally generated failure bubble.
    Error,
    System,
}

impl Role {
    /// Map a server `message_type` string to a role.
    ///
    /// Unknown types render as system notices rather than being dropped, so
    /// a history load stays lossless.
    #[must_use]
    pub fn from_message_type(message_type: &str) -> Self {
        match message_type {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "error" => Self::Error,
            _ => Self::System,
        }
    }
}

/// A single conversation message.
///
/// Immutable once appended. `id` is generated locally for `User` and `Error`
/// messages and server-assigned for `Assistant` messages.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: f64,
    /// Model that produced an assistant message, when the backend reports it.
    pub model: Option<String>,
    /// Provider serving that model (e.g. `"ollama"`).
    pub provider: Option<String>,
}

/// Best-effort model warmup bookkeeping for the current conversation turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WarmupState {
    /// A warmup call was already issued this turn.
    pub has_warmed: bool,
    /// A warmup call is currently in flight.
    pub is_warming: bool,
}

/// Chat state: the ordered transcript plus send/warmup bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct ChatState {
    /// Append-only transcript, oldest first.
    pub messages: Vec<Message>,
    /// Warmup bookkeeping; reset whenever a send completes.
    pub warmup: WarmupState,
    /// True while a history load is in flight.
    pub history_loading: bool,
    /// Most recent history/clear failure, for an optional banner.
    pub last_error: Option<String>,
    /// Token of the in-flight send, if any.
    pending: Option<u64>,
    /// Next token to mint; tokens are never reused within a session.
    next_token: u64,
}

impl ChatState {
    /// Start a send turn.
    ///
    /// Returns the pending-request token, or `None` when a send is already
    /// in flight (the caller must reject the new send without a network
    /// call).
    pub fn begin_send(&mut self) -> Option<u64> {
        if self.pending.is_some() {
            return None;
        }
        self.next_token += 1;
        self.pending = Some(self.next_token);
        Some(self.next_token)
    }

    /// Whether a send is currently in flight.
    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.pending.is_some()
    }

    /// Append the optimistic local user message for the current turn.
    pub fn push_user_message(&mut self, id: String, content: String, now_ms: f64) {
        self.messages.push(Message {
            id,
            role: Role::User,
            content,
            created_at: now_ms,
            model: None,
            provider: None,
        });
    }

    /// Resolve the pending send with the assistant reply.
    ///
    /// Returns `false` (and appends nothing) when `token` is stale, i.e. the
    /// turn already resolved the other way. Completing a turn frees the
    /// pending slot and resets warmup for the next turn.
    pub fn resolve_send(&mut self, token: u64, message: Message) -> bool {
        if !self.finish_turn(token) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Resolve the pending send with a failure bubble.
    ///
    /// Same staleness contract as [`Self::resolve_send`].
    pub fn fail_send(&mut self, token: u64, id: String, explanation: String, now_ms: f64) -> bool {
        if !self.finish_turn(token) {
            return false;
        }
        self.messages.push(Message {
            id,
            role: Role::Error,
            content: explanation,
            created_at: now_ms,
            model: None,
            provider: None,
        });
        true
    }

    fn finish_turn(&mut self, token: u64) -> bool {
        if self.pending != Some(token) {
            return false;
        }
        self.pending = None;
        self.warmup = WarmupState::default();
        true
    }

    /// Replace the transcript wholesale with server-provided history.
    pub fn replace_history(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.history_loading = false;
        self.last_error = None;
    }

    /// Empty the transcript after a confirmed server-side clear.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.last_error = None;
    }
}
