//! Shared wire-protocol DTOs for the chat backend boundary.
//!
//! DESIGN
//! ======
//! These types mirror the backend's request/response schemas field for field
//! so serde stays lossless; open-ended `metadata` objects are carried
//! opaquely. The error taxonomy classifies every way a call can fail into
//! the categories the pipeline turns into user-facing copy.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

/// User identity sent with every chat call until real auth lands.
pub const DEFAULT_USER_ID: &str = "default_user";

/// Request body for `POST /api/chat/message`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    pub content: String,
    pub user_id: String,
}

/// Response body for `POST /api/chat/message`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatResponse {
    /// Server-assigned id of the stored assistant message.
    pub message_id: String,
    /// The assistant's reply text.
    pub response: String,
    /// ISO 8601 timestamp assigned by the server.
    pub timestamp: String,
    pub model: String,
    pub provider: String,
    /// Provider-specific extras (token counts, durations); passed through.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// One record from `GET /api/chat/history`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    /// `"user"`, `"assistant"`, or a future server-side type.
    pub message_type: String,
    pub content: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Body of `GET /api/health`.
#[derive(Clone, Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Per-user usage counters from `GET /api/chat/stats`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatStats {
    pub user_id: String,
    pub total_messages: i64,
    pub user_messages: i64,
    pub assistant_messages: i64,
    #[serde(default)]
    pub avg_user_message_length: f64,
    #[serde(default)]
    pub profile_exists: bool,
}

/// Failure classes for backend calls.
///
/// `from_status` covers responses that arrived; the transport-level variants
/// are assigned at the call sites that observe them.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never reached the backend.
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),
    /// The cooperative send timeout elapsed before the backend answered.
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    /// The backend answered with a 5xx status.
    #[error("server error (status {0})")]
    ServerError(u16),
    /// The backend answered with a 4xx status.
    #[error("client error (status {0})")]
    ClientError(u16),
    /// Anything else: decode failures, unexpected statuses.
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl ApiError {
    /// Classify a non-OK HTTP status.
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            500..=599 => Self::ServerError(status),
            400..=499 => Self::ClientError(status),
            _ => Self::Unknown(format!("unexpected status {status}")),
        }
    }

    /// Whether this failure means the backend is unreachable and the
    /// connection manager should re-check.
    #[must_use]
    pub fn is_connection_loss(&self) -> bool {
        matches!(self, Self::NetworkUnreachable(_))
    }
}
