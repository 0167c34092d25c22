use super::*;

#[test]
fn fixed_endpoints_are_under_the_api_prefix() {
    assert_eq!(MESSAGE_ENDPOINT, "/api/chat/message");
    assert_eq!(WARMUP_ENDPOINT, "/api/chat/warmup");
    assert_eq!(HEALTH_ENDPOINT, "/api/health");
}

#[test]
fn history_endpoint_carries_paging_parameters() {
    assert_eq!(
        history_endpoint("default_user", 50, 0),
        "/api/chat/history?user_id=default_user&limit=50&offset=0"
    );
    assert_eq!(
        history_endpoint("u2", 10, 20),
        "/api/chat/history?user_id=u2&limit=10&offset=20"
    );
}

#[test]
fn clear_endpoint_targets_the_user() {
    assert_eq!(clear_endpoint("default_user"), "/api/chat/clear?user_id=default_user");
}

#[test]
fn stats_endpoint_targets_the_user() {
    assert_eq!(stats_endpoint("default_user"), "/api/chat/stats?user_id=default_user");
}
