use super::*;

#[test]
fn chat_response_parses_backend_payload() {
    let resp: ChatResponse = serde_json::from_value(serde_json::json!({
        "message_id": "m1",
        "response": "hi there",
        "timestamp": "2026-08-05T12:00:00Z",
        "model": "llama3.2",
        "provider": "ollama",
        "metadata": {"total_duration": 1_200_000}
    }))
    .expect("response should parse");
    assert_eq!(resp.message_id, "m1");
    assert_eq!(resp.response, "hi there");
    assert_eq!(resp.model, "llama3.2");
    assert_eq!(resp.provider, "ollama");
    assert_eq!(resp.metadata["total_duration"], 1_200_000);
}

#[test]
fn chat_response_tolerates_missing_metadata() {
    let resp: ChatResponse = serde_json::from_value(serde_json::json!({
        "message_id": "m1",
        "response": "ok",
        "timestamp": "2026-08-05T12:00:00Z",
        "model": "llama3.2",
        "provider": "ollama"
    }))
    .expect("response should parse without metadata");
    assert!(resp.metadata.is_null());
}

#[test]
fn history_record_parses_backend_rows() {
    let rows: Vec<HistoryRecord> = serde_json::from_value(serde_json::json!([
        {"id": "1", "message_type": "user", "content": "hello", "timestamp": "2026-08-05T11:59:00Z"},
        {"id": "2", "message_type": "assistant", "content": "hi", "timestamp": "2026-08-05T12:00:00Z", "metadata": {}}
    ]))
    .expect("history should parse");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].message_type, "user");
    assert_eq!(rows[1].content, "hi");
}

#[test]
fn health_body_only_needs_the_status_field() {
    let health: HealthStatus = serde_json::from_value(serde_json::json!({
        "status": "healthy",
        "timestamp": "2026-08-05T12:00:00Z",
        "version": "1.0.0",
        "database": "connected"
    }))
    .expect("health body should parse");
    assert_eq!(health.status, "healthy");
}

#[test]
fn chat_request_serializes_expected_fields() {
    let body = serde_json::to_value(ChatRequest {
        content: "hello".to_owned(),
        user_id: DEFAULT_USER_ID.to_owned(),
    })
    .expect("request should serialize");
    assert_eq!(
        body,
        serde_json::json!({"content": "hello", "user_id": "default_user"})
    );
}

#[test]
fn chat_stats_defaults_optional_profile_fields() {
    let stats: ChatStats = serde_json::from_value(serde_json::json!({
        "user_id": "default_user",
        "total_messages": 12,
        "user_messages": 6,
        "assistant_messages": 6
    }))
    .expect("stats should parse");
    assert!(!stats.profile_exists);
    assert!((stats.avg_user_message_length - 0.0).abs() < f64::EPSILON);
}

#[test]
fn from_status_classifies_by_range() {
    assert_eq!(ApiError::from_status(500), ApiError::ServerError(500));
    assert_eq!(ApiError::from_status(503), ApiError::ServerError(503));
    assert_eq!(ApiError::from_status(404), ApiError::ClientError(404));
    assert_eq!(ApiError::from_status(429), ApiError::ClientError(429));
    assert!(matches!(ApiError::from_status(302), ApiError::Unknown(_)));
}

#[test]
fn only_network_failures_count_as_connection_loss() {
    assert!(ApiError::NetworkUnreachable("fetch failed".to_owned()).is_connection_loss());
    assert!(!ApiError::Timeout(300_000).is_connection_loss());
    assert!(!ApiError::ServerError(500).is_connection_loss());
    assert!(!ApiError::ClientError(400).is_connection_loss());
    assert!(!ApiError::Unknown("decode".to_owned()).is_connection_loss());
}

#[test]
fn api_error_display_names_the_category() {
    assert_eq!(
        ApiError::ServerError(503).to_string(),
        "server error (status 503)"
    );
    assert_eq!(
        ApiError::Timeout(300_000).to_string(),
        "request timed out after 300000 ms"
    );
}
