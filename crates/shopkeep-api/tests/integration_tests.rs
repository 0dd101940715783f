//! Integration tests for the shop assistant API.
//!
//! Each test drives the router with `oneshot` against its own in-memory
//! database seeded with the sample catalog.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use shopkeep_api::create_router;
use shopkeep_api::error::ErrorBody;
use shopkeep_api::handlers::{HealthResponse, HistoryResponse, SendMessageResponse, SessionsResponse};
use shopkeep_api::state::AppState;
use shopkeep_chat::{ChatError, GenerativeBackend, GenerativeFallbackClient, TurnDispatcher};
use shopkeep_core::config::ShopkeepConfig;
use shopkeep_core::error::ShopkeepError;
use shopkeep_storage::{seed_sample_catalog, CatalogStore, Database};

// =============================================================================
// Helpers
// =============================================================================

struct CannedBackend(&'static str);

#[async_trait]
impl GenerativeBackend for CannedBackend {
    fn name(&self) -> &'static str {
        "canned"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, ChatError> {
        Ok(self.0.to_string())
    }
}

fn make_state_with(config: ShopkeepConfig, generative: GenerativeFallbackClient) -> AppState {
    let db = Arc::new(Database::in_memory().unwrap());
    seed_sample_catalog(&db).unwrap();
    let catalog = Arc::new(CatalogStore::new(Arc::clone(&db)));
    let dispatcher = TurnDispatcher::with_generative(catalog, generative, &config);
    AppState::new(config, db, dispatcher)
}

fn make_state() -> AppState {
    make_state_with(
        ShopkeepConfig::default(),
        GenerativeFallbackClient::unavailable(),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

/// Read full response body bytes.
async fn body_bytes(resp: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}

/// POST a chat message and decode the successful response.
async fn send(state: &AppState, message: &str, token: Option<&str>) -> SendMessageResponse {
    let body = serde_json::json!({ "message": message, "session_token": token });
    let resp = create_router(state.clone())
        .oneshot(post_json("/api/chat/message", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn reply_type(resp: &SendMessageResponse) -> &str {
    resp.bot_response
        .extra_data
        .as_ref()
        .and_then(|m| m["type"].as_str())
        .unwrap_or_default()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_happy_path() {
    let resp = create_router(make_state())
        .oneshot(get("/api/health"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let health: HealthResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(health.status, "healthy");
    assert!(!health.message.is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let resp = create_router(make_state())
        .oneshot(get("/api/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// POST /api/chat/message
// =============================================================================

#[tokio::test]
async fn test_greeting_creates_session() {
    let state = make_state();
    let resp = send(&state, "hello", None).await;

    assert!(!resp.session_token.is_empty());
    assert_eq!(resp.user_message.message_type, "user");
    assert_eq!(resp.user_message.content, "hello");
    assert_eq!(resp.bot_response.message_type, "bot");
    assert_eq!(reply_type(&resp), "greeting");
    assert!(!resp.bot_response.content.is_empty());
}

#[tokio::test]
async fn test_product_search_over_seeded_catalog() {
    let state = make_state();
    let resp = send(&state, "do you have laptops", None).await;

    assert_eq!(reply_type(&resp), "product_search_results");
    let metadata = resp.bot_response.extra_data.unwrap();
    assert_eq!(metadata["products"].as_array().unwrap().len(), 3);
    assert_eq!(metadata["search_terms"], serde_json::json!(["laptop"]));
    assert!(resp.bot_response.content.contains("MacBook Air M3"));
}

#[tokio::test]
async fn test_category_browse_lists_seeded_categories() {
    let state = make_state();
    let resp = send(&state, "browse categories", None).await;

    assert_eq!(reply_type(&resp), "category_list");
    let metadata = resp.bot_response.extra_data.unwrap();
    let categories = metadata["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 17);
    assert!(categories
        .iter()
        .all(|c| c["product_count"].as_u64().is_some()));
}

#[tokio::test]
async fn test_general_without_generative_is_fallback() {
    let state = make_state();
    let resp = send(&state, "what's the best laptop under $1000?", None).await;
    assert_eq!(reply_type(&resp), "fallback");
}

#[tokio::test]
async fn test_general_with_generative_backend() {
    let state = make_state_with(
        ShopkeepConfig::default(),
        GenerativeFallbackClient::with_backend(
            Arc::new(CannedBackend("The Dell XPS 13 is $999.00.")),
            Duration::from_secs(1),
        ),
    );
    let resp = send(&state, "what's the best laptop under $1000?", None).await;

    assert_eq!(reply_type(&resp), "generative_response");
    assert_eq!(resp.bot_response.content, "The Dell XPS 13 is $999.00.");
}

#[tokio::test]
async fn test_session_token_is_reused() {
    let state = make_state();
    let first = send(&state, "hi", None).await;
    let second = send(&state, "bye", Some(&first.session_token)).await;

    assert_eq!(first.session_token, second.session_token);
    assert_eq!(first.bot_response.session_id, second.bot_response.session_id);
}

#[tokio::test]
async fn test_unknown_token_starts_new_session() {
    let state = make_state();
    let resp = send(&state, "hi", Some("not-a-real-token")).await;
    assert_ne!(resp.session_token, "not-a-real-token");
}

#[tokio::test]
async fn test_blank_message_returns_400() {
    for body in [r#"{"message": "   "}"#, r#"{"message": ""}"#, r#"{}"#] {
        let resp = create_router(make_state())
            .oneshot(post_json("/api/chat/message", body))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {}", body);
        let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
        assert_eq!(err.error, "bad_request");
    }
}

#[tokio::test]
async fn test_blank_message_stores_nothing() {
    let state = make_state();
    let resp = create_router(state.clone())
        .oneshot(post_json("/api/chat/message", r#"{"message": " "}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let page = state.sessions.list(1, 10).unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_message_too_long_returns_400() {
    let mut config = ShopkeepConfig::default();
    config.chat.max_message_length = 20;
    let state = make_state_with(config, GenerativeFallbackClient::unavailable());

    let body = serde_json::json!({ "message": "x".repeat(21) });
    let resp = create_router(state)
        .oneshot(post_json("/api/chat/message", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_chat_disabled_returns_503() {
    let mut config = ShopkeepConfig::default();
    config.chat.enabled = false;
    let state = make_state_with(config, GenerativeFallbackClient::unavailable());

    let resp = create_router(state)
        .oneshot(post_json("/api/chat/message", r#"{"message": "hello"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "service_unavailable");
}

/// Make every bot message insert fail.
fn reject_bot_messages(db: &Database) {
    db.with_conn(|conn| {
        conn.execute_batch(
            "CREATE TRIGGER reject_bot BEFORE INSERT ON chat_messages
             WHEN NEW.message_type = 'bot'
             BEGIN SELECT RAISE(ABORT, 'bot writes disabled'); END;",
        )
        .map_err(|e| ShopkeepError::Storage(e.to_string()))
    })
    .unwrap();
}

#[tokio::test]
async fn test_failed_turn_write_stores_nothing() {
    let state = make_state();
    reject_bot_messages(&state.database);

    let resp = create_router(state.clone())
        .oneshot(post_json("/api/chat/message", r#"{"message": "hello"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "internal_error");

    assert_eq!(state.sessions.list(1, 10).unwrap().total, 0);
}

#[tokio::test]
async fn test_failed_turn_keeps_earlier_history_intact() {
    let state = make_state();
    let first = send(&state, "hello", None).await;
    reject_bot_messages(&state.database);

    let body = serde_json::json!({ "message": "bye", "session_token": first.session_token });
    let resp = create_router(state.clone())
        .oneshot(post_json("/api/chat/message", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let session = state
        .sessions
        .find_by_token(&first.session_token)
        .unwrap()
        .unwrap();
    let history = state.sessions.history(session.id).unwrap();
    let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 2);
    assert_eq!(contents[0], "hello");
}

// =============================================================================
// GET /api/chat/history
// =============================================================================

#[tokio::test]
async fn test_history_in_order() {
    let state = make_state();
    let first = send(&state, "hello", None).await;
    send(&state, "do you have laptops", Some(&first.session_token)).await;

    let uri = format!("/api/chat/history?session_token={}", first.session_token);
    let resp = create_router(state).oneshot(get(&uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(history.session.session_token, first.session_token);
    let kinds: Vec<&str> = history
        .messages
        .iter()
        .map(|m| m.message_type.as_str())
        .collect();
    assert_eq!(kinds, vec!["user", "bot", "user", "bot"]);
    assert_eq!(history.messages[2].content, "do you have laptops");
    assert_eq!(
        history.messages[3].extra_data.as_ref().unwrap()["type"],
        "product_search_results"
    );
}

#[tokio::test]
async fn test_history_missing_token_returns_400() {
    let resp = create_router(make_state())
        .oneshot(get("/api/chat/history"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_unknown_token_returns_404() {
    let resp = create_router(make_state())
        .oneshot(get("/api/chat/history?session_token=missing"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: ErrorBody = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(err.error, "not_found");
}

// =============================================================================
// GET /api/chat/sessions
// =============================================================================

#[tokio::test]
async fn test_sessions_pagination() {
    let state = make_state();
    for _ in 0..3 {
        send(&state, "hi", None).await;
    }

    let resp = create_router(state.clone())
        .oneshot(get("/api/chat/sessions?page=1&per_page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let page: SessionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(page.sessions.len(), 2);
    assert_eq!(page.pagination.total, 3);
    assert_eq!(page.pagination.pages, 2);

    let resp = create_router(state)
        .oneshot(get("/api/chat/sessions?page=2&per_page=2"))
        .await
        .unwrap();
    let page: SessionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(page.sessions.len(), 1);
}

#[tokio::test]
async fn test_sessions_per_page_capped() {
    let resp = create_router(make_state())
        .oneshot(get("/api/chat/sessions?per_page=500"))
        .await
        .unwrap();
    let page: SessionsResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(page.pagination.per_page, 100);
    assert_eq!(page.pagination.page, 1);
}

// =============================================================================
// POST /api/chat/reset
// =============================================================================

#[tokio::test]
async fn test_reset_ends_session() {
    let state = make_state();
    let first = send(&state, "hi", None).await;

    let body = serde_json::json!({ "session_token": first.session_token });
    let resp = create_router(state.clone())
        .oneshot(post_json("/api/chat/reset", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert_eq!(json["message"], "Chat session reset successfully");

    let next = send(&state, "hi again", Some(&first.session_token)).await;
    assert_ne!(next.session_token, first.session_token);

    // The reset session keeps its history.
    let uri = format!("/api/chat/history?session_token={}", first.session_token);
    let resp = create_router(state).oneshot(get(&uri)).await.unwrap();
    let history: HistoryResponse = serde_json::from_slice(&body_bytes(resp).await).unwrap();
    assert!(!history.session.is_active);
    assert_eq!(history.messages.len(), 2);
}

#[tokio::test]
async fn test_reset_without_token_succeeds() {
    let resp = create_router(make_state())
        .oneshot(post_json("/api/chat/reset", "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
