//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/body parameters via axum extractors,
//! works through the AppState services, and returns JSON responses.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use shopkeep_storage::{ChatMessageRow, ChatSessionRow};

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_PER_PAGE: u32 = 20;

// =============================================================================
// Request / query types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: Option<String>,
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub session_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionsParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_token: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub version: String,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatSessionResponse {
    pub id: i64,
    pub session_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<ChatSessionRow> for ChatSessionResponse {
    fn from(row: ChatSessionRow) -> Self {
        Self {
            id: row.id,
            session_token: row.session_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub id: i64,
    pub session_id: i64,
    pub message_type: String,
    pub content: String,
    pub extra_data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessageRow> for ChatMessageResponse {
    fn from(row: ChatMessageRow) -> Self {
        Self {
            id: row.id,
            session_id: row.session_id,
            message_type: row.message_type.as_str().to_string(),
            content: row.content,
            extra_data: row.extra_data,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    pub session_token: String,
    pub user_message: ChatMessageResponse,
    pub bot_response: ChatMessageResponse,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session: ChatSessionResponse,
    pub messages: Vec<ChatMessageResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<ChatSessionResponse>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /api/health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Shop assistant API is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /api/chat/message - run one chat turn and store both sides of it.
///
/// An absent, unknown or reset `session_token` starts a new session.
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    if !state.config.chat.enabled {
        return Err(ApiError::ServiceUnavailable(
            "Chat is disabled".to_string(),
        ));
    }

    let message = body.message.unwrap_or_default();
    state.dispatcher.validate(&message)?;

    // Nothing is written until the reply exists; the turn is then stored
    // in one transaction.
    let resumed = state.sessions.find_active(body.session_token.as_deref())?;
    let session_id = resumed.as_ref().map_or(0, |s| s.id);

    let reply = state.dispatcher.handle(&message, session_id).await?;

    let record = state.sessions.record_turn(
        resumed.as_ref().map(|s| s.session_token.as_str()),
        &message,
        &reply.content,
        &reply.metadata_value(),
    )?;

    info!(
        session_id = record.session.id,
        reply_type = reply.reply_type(),
        "Chat message processed"
    );

    Ok(Json(SendMessageResponse {
        session_token: record.session.session_token,
        user_message: record.user_message.into(),
        bot_response: record.bot_message.into(),
    }))
}

/// GET /api/chat/history?session_token= - all messages of a session.
pub async fn chat_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let token = params
        .session_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Session token is required".to_string()))?;

    let session = state
        .sessions
        .find_by_token(&token)?
        .ok_or_else(|| ApiError::NotFound("Session not found".to_string()))?;

    let messages = state
        .sessions
        .history(session.id)?
        .into_iter()
        .map(ChatMessageResponse::from)
        .collect();

    Ok(Json(HistoryResponse {
        session: session.into(),
        messages,
    }))
}

/// GET /api/chat/sessions?page=&per_page= - sessions, most recent first.
pub async fn chat_sessions(
    State(state): State<AppState>,
    Query(params): Query<SessionsParams>,
) -> Result<Json<SessionsResponse>, ApiError> {
    let page = state.sessions.list(
        params.page.unwrap_or(1),
        params.per_page.unwrap_or(DEFAULT_PER_PAGE),
    )?;

    let pagination = Pagination {
        page: page.page,
        per_page: page.per_page,
        total: page.total,
        pages: page.pages(),
    };

    Ok(Json(SessionsResponse {
        sessions: page
            .sessions
            .into_iter()
            .map(ChatSessionResponse::from)
            .collect(),
        pagination,
    }))
}

/// POST /api/chat/reset - end a session so its token is no longer resumed.
pub async fn reset_chat(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(token) = body.session_token.filter(|t| !t.is_empty()) {
        let found = state.sessions.deactivate(&token)?;
        info!(found, "Chat session reset");
    }

    Ok(Json(MessageResponse {
        message: "Chat session reset successfully".to_string(),
    }))
}
