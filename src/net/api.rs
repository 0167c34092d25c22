//! REST API helpers for communicating with the chat backend.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`.
//! Server-side: stubs returning errors/`None` since these endpoints are only
//! meaningful in the browser.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is folded into [`ApiError`] instead of panicking: transport
//! failures become `NetworkUnreachable`, non-OK statuses are classified by
//! code, and decode failures land in `Unknown`. Callers decide whether a
//! failure is user-visible.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use super::types::ApiError;
use super::types::{ChatResponse, ChatStats, HistoryRecord};
#[cfg(feature = "hydrate")]
use super::types::ChatRequest;

#[cfg(any(test, feature = "hydrate"))]
const MESSAGE_ENDPOINT: &str = "/api/chat/message";
#[cfg(any(test, feature = "hydrate"))]
const WARMUP_ENDPOINT: &str = "/api/chat/warmup";
#[cfg(any(test, feature = "hydrate"))]
const HEALTH_ENDPOINT: &str = "/api/health";

#[cfg(any(test, feature = "hydrate"))]
fn history_endpoint(user_id: &str, limit: u32, offset: u32) -> String {
    format!("/api/chat/history?user_id={user_id}&limit={limit}&offset={offset}")
}

#[cfg(any(test, feature = "hydrate"))]
fn clear_endpoint(user_id: &str) -> String {
    format!("/api/chat/clear?user_id={user_id}")
}

#[cfg(any(test, feature = "hydrate"))]
fn stats_endpoint(user_id: &str) -> String {
    format!("/api/chat/stats?user_id={user_id}")
}

/// Send one user message and wait for the assistant's reply.
///
/// No client-side timeout is applied here; the pipeline's cooperative
/// cancellation window is the authoritative bound.
///
/// # Errors
///
/// Returns a classified [`ApiError`] when the request cannot be sent, the
/// backend answers with a non-OK status, or the body fails to decode.
pub async fn send_chat_message(content: &str, user_id: &str) -> Result<ChatResponse, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let payload = ChatRequest {
            content: content.to_owned(),
            user_id: user_id.to_owned(),
        };
        let resp = gloo_net::http::Request::post(MESSAGE_ENDPOINT)
            .json(&payload)
            .map_err(|e| ApiError::Unknown(e.to_string()))?
            .send()
            .await
            .map_err(|e| ApiError::NetworkUnreachable(e.to_string()))?;
        if !resp.ok() {
            return Err(ApiError::from_status(resp.status()));
        }
        resp.json::<ChatResponse>()
            .await
            .map_err(|e| ApiError::Unknown(e.to_string()))
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (content, user_id);
        Err(ApiError::Unknown("not available on server".to_owned()))
    }
}

/// Fetch conversation history, oldest first.
///
/// # Errors
///
/// Returns a classified [`ApiError`]; the caller must leave its in-memory
/// transcript untouched on failure.
pub async fn fetch_history(
    user_id: &str,
    limit: u32,
    offset: u32,
) -> Result<Vec<HistoryRecord>, ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let url = history_endpoint(user_id, limit, offset);
        let resp = gloo_net::http::Request::get(&url)
            .send()
            .await
            .map_err(|e| ApiError::NetworkUnreachable(e.to_string()))?;
        if !resp.ok() {
            return Err(ApiError::from_status(resp.status()));
        }
        resp.json::<Vec<HistoryRecord>>()
            .await
            .map_err(|e| ApiError::Unknown(e.to_string()))
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = (user_id, limit, offset);
        Err(ApiError::Unknown("not available on server".to_owned()))
    }
}

/// Delete the server-side conversation history for `user_id`.
///
/// # Errors
///
/// Returns a classified [`ApiError`]; the caller must keep its local
/// transcript when this fails.
pub async fn clear_history(user_id: &str) -> Result<(), ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let url = clear_endpoint(user_id);
        let resp = gloo_net::http::Request::delete(&url)
            .send()
            .await
            .map_err(|e| ApiError::NetworkUnreachable(e.to_string()))?;
        if !resp.ok() {
            return Err(ApiError::from_status(resp.status()));
        }
        Ok(())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = user_id;
        Err(ApiError::Unknown("not available on server".to_owned()))
    }
}

/// Ask the backend to pre-load the model. Best-effort; callers ignore the
/// outcome beyond UI feedback.
///
/// # Errors
///
/// Returns a classified [`ApiError`] when the call cannot be made or the
/// backend rejects it.
pub async fn send_warmup() -> Result<(), ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let payload = serde_json::json!({ "warmup": true });
        let resp = gloo_net::http::Request::post(WARMUP_ENDPOINT)
            .json(&payload)
            .map_err(|e| ApiError::Unknown(e.to_string()))?
            .send()
            .await
            .map_err(|e| ApiError::NetworkUnreachable(e.to_string()))?;
        if !resp.ok() {
            return Err(ApiError::from_status(resp.status()));
        }
        Ok(())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(ApiError::Unknown("not available on server".to_owned()))
    }
}

/// Lightweight reachability probe against `GET /api/health`.
///
/// Any 2xx answer counts as reachable; the body is not interpreted beyond
/// that.
///
/// # Errors
///
/// Returns a classified [`ApiError`] when the backend is unreachable or
/// unhealthy.
pub async fn probe_health() -> Result<(), ApiError> {
    #[cfg(feature = "hydrate")]
    {
        let resp = gloo_net::http::Request::get(HEALTH_ENDPOINT)
            .send()
            .await
            .map_err(|e| ApiError::NetworkUnreachable(e.to_string()))?;
        if !resp.ok() {
            return Err(ApiError::from_status(resp.status()));
        }
        // Reachable even when degraded; surface the reported status only.
        if let Ok(health) = resp.json::<super::types::HealthStatus>().await
            && health.status != "healthy"
        {
            leptos::logging::log!("backend health: {}", health.status);
        }
        Ok(())
    }
    #[cfg(not(feature = "hydrate"))]
    {
        Err(ApiError::Unknown("not available on server".to_owned()))
    }
}

/// Fetch per-user chat statistics. Returns `None` on any failure; the stats
/// view degrades to placeholders.
pub async fn fetch_chat_stats(user_id: &str) -> Option<ChatStats> {
    #[cfg(feature = "hydrate")]
    {
        let url = stats_endpoint(user_id);
        let resp = gloo_net::http::Request::get(&url).send().await.ok()?;
        if !resp.ok() {
            return None;
        }
        resp.json::<ChatStats>().await.ok()
    }
    #[cfg(not(feature = "hydrate"))]
    {
        let _ = user_id;
        None
    }
}
