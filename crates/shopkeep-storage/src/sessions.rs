//! Chat session and message persistence.
//!
//! Sessions are addressed by an opaque token handed to the client. Messages
//! are appended per session; bot messages carry the reply metadata as JSON.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use shopkeep_core::error::ShopkeepError;

use crate::db::Database;

/// Maximum page size for session listings.
pub const MAX_PER_PAGE: u32 = 100;

/// Author of a stored chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    User,
    Bot,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Bot => "bot",
        }
    }

    fn parse(s: &str) -> Self {
        if s == "bot" {
            MessageType::Bot
        } else {
            MessageType::User
        }
    }
}

/// A stored chat session.
#[derive(Debug, Clone)]
pub struct ChatSessionRow {
    pub id: i64,
    pub session_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// A stored chat message.
#[derive(Debug, Clone)]
pub struct ChatMessageRow {
    pub id: i64,
    pub session_id: i64,
    pub message_type: MessageType,
    pub content: String,
    pub extra_data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// One page of a session listing.
#[derive(Debug, Clone)]
pub struct SessionPage {
    pub sessions: Vec<ChatSessionRow>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl SessionPage {
    /// Number of pages needed to show `total` sessions.
    pub fn pages(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

/// Everything written for one chat turn.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub session: ChatSessionRow,
    pub user_message: ChatMessageRow,
    pub bot_message: ChatMessageRow,
}

/// Repository for chat sessions and their messages.
pub struct ChatSessionRepository {
    db: Arc<Database>,
}

impl ChatSessionRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Find a session by token regardless of its active flag.
    pub fn find_by_token(&self, token: &str) -> Result<Option<ChatSessionRow>, ShopkeepError> {
        self.db.with_conn(|conn| select_session(conn, token))
    }

    /// The session a message carrying `token` would resume, if any.
    pub fn find_active(&self, token: Option<&str>) -> Result<Option<ChatSessionRow>, ShopkeepError> {
        match token.filter(|t| !t.is_empty()) {
            Some(token) => Ok(self.find_by_token(token)?.filter(|s| s.is_active)),
            None => Ok(None),
        }
    }

    /// Create a new active session with a fresh token.
    pub fn create(&self) -> Result<ChatSessionRow, ShopkeepError> {
        self.db.with_conn(insert_session)
    }

    /// Resume the active session for `token`, or start a new one when the
    /// token is absent, unknown, or belongs to a reset session.
    pub fn get_or_create(&self, token: Option<&str>) -> Result<ChatSessionRow, ShopkeepError> {
        self.db
            .with_transaction(|tx| resume_or_insert_session(tx, token))
    }

    /// Append a message to a session.
    pub fn append_message(
        &self,
        session_id: i64,
        message_type: MessageType,
        content: &str,
        extra_data: Option<&serde_json::Value>,
    ) -> Result<ChatMessageRow, ShopkeepError> {
        self.db.with_conn(|conn| {
            insert_message(conn, session_id, message_type, content, extra_data)
        })
    }

    /// Bump a session's `updated_at` to now.
    pub fn touch(&self, session_id: i64) -> Result<(), ShopkeepError> {
        self.db.with_conn(|conn| touch_session(conn, session_id))
    }

    /// Store one complete turn: resume or create the session, append the user
    /// message and the bot reply, and bump `updated_at`.
    ///
    /// All of it is one transaction; on failure nothing is stored.
    pub fn record_turn(
        &self,
        token: Option<&str>,
        user_text: &str,
        bot_text: &str,
        bot_metadata: &serde_json::Value,
    ) -> Result<TurnRecord, ShopkeepError> {
        let record = self.db.with_transaction(|tx| {
            let session = resume_or_insert_session(tx, token)?;
            let user_message = insert_message(tx, session.id, MessageType::User, user_text, None)?;
            let bot_message = insert_message(
                tx,
                session.id,
                MessageType::Bot,
                bot_text,
                Some(bot_metadata),
            )?;
            touch_session(tx, session.id)?;
            Ok(TurnRecord {
                session,
                user_message,
                bot_message,
            })
        })?;
        debug!(session_id = record.session.id, "Chat turn recorded");
        Ok(record)
    }

    /// All messages of a session in the order they were written.
    pub fn history(&self, session_id: i64) -> Result<Vec<ChatMessageRow>, ShopkeepError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, session_id, message_type, content, extra_data, timestamp
                     FROM chat_messages
                     WHERE session_id = ?1
                     ORDER BY timestamp ASC, id ASC",
                )
                .map_err(|e| ShopkeepError::Storage(format!("History prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id], row_to_message)
                .map_err(|e| ShopkeepError::Storage(format!("History query: {}", e)))?;

            let mut messages = Vec::new();
            for row in rows {
                messages.push(row.map_err(|e| ShopkeepError::Storage(e.to_string()))?);
            }
            Ok(messages)
        })
    }

    /// List sessions, most recently updated first.
    ///
    /// `page` is 1-based; `per_page` is clamped to `1..=MAX_PER_PAGE`.
    pub fn list(&self, page: u32, per_page: u32) -> Result<SessionPage, ShopkeepError> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let offset = i64::from(page - 1) * i64::from(per_page);

        self.db.with_conn(|conn| {
            let total: i64 = conn
                .query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))
                .map_err(|e| ShopkeepError::Storage(format!("Session count: {}", e)))?;

            let mut stmt = conn
                .prepare(
                    "SELECT id, session_token, created_at, updated_at, is_active
                     FROM chat_sessions
                     ORDER BY updated_at DESC, id DESC
                     LIMIT ?1 OFFSET ?2",
                )
                .map_err(|e| ShopkeepError::Storage(format!("Session list prepare: {}", e)))?;

            let rows = stmt
                .query_map(rusqlite::params![i64::from(per_page), offset], row_to_session)
                .map_err(|e| ShopkeepError::Storage(format!("Session list: {}", e)))?;

            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row.map_err(|e| ShopkeepError::Storage(e.to_string()))?);
            }

            Ok(SessionPage {
                sessions,
                page,
                per_page,
                total: total.max(0) as u64,
            })
        })
    }

    /// Mark the session for `token` inactive. Returns whether a session was found.
    pub fn deactivate(&self, token: &str) -> Result<bool, ShopkeepError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chat_sessions SET is_active = 0, updated_at = ?1
                     WHERE session_token = ?2",
                    rusqlite::params![Utc::now().timestamp(), token],
                )
                .map_err(|e| ShopkeepError::Storage(format!("Failed to reset session: {}", e)))?;
            Ok(changed > 0)
        })
    }
}

fn select_session(conn: &Connection, token: &str) -> Result<Option<ChatSessionRow>, ShopkeepError> {
    conn.query_row(
        "SELECT id, session_token, created_at, updated_at, is_active
         FROM chat_sessions WHERE session_token = ?1",
        rusqlite::params![token],
        row_to_session,
    )
    .optional()
    .map_err(|e| ShopkeepError::Storage(format!("Session lookup: {}", e)))
}

fn insert_session(conn: &Connection) -> Result<ChatSessionRow, ShopkeepError> {
    let token = Uuid::new_v4().to_string();
    let now = Utc::now().timestamp();
    conn.execute(
        "INSERT INTO chat_sessions (session_token, created_at, updated_at, is_active)
         VALUES (?1, ?2, ?2, 1)",
        rusqlite::params![token, now],
    )
    .map_err(|e| ShopkeepError::Storage(format!("Failed to create session: {}", e)))?;
    let id = conn.last_insert_rowid();
    debug!(session_id = id, "Chat session created");

    Ok(ChatSessionRow {
        id,
        session_token: token,
        created_at: epoch_to_utc(now),
        updated_at: epoch_to_utc(now),
        is_active: true,
    })
}

fn resume_or_insert_session(
    conn: &Connection,
    token: Option<&str>,
) -> Result<ChatSessionRow, ShopkeepError> {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        if let Some(session) = select_session(conn, token)? {
            if session.is_active {
                return Ok(session);
            }
        }
    }
    insert_session(conn)
}

fn insert_message(
    conn: &Connection,
    session_id: i64,
    message_type: MessageType,
    content: &str,
    extra_data: Option<&serde_json::Value>,
) -> Result<ChatMessageRow, ShopkeepError> {
    let now = Utc::now().timestamp();
    let extra_json = extra_data.map(serde_json::to_string).transpose()?;

    conn.execute(
        "INSERT INTO chat_messages (session_id, message_type, content, extra_data, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![session_id, message_type.as_str(), content, extra_json, now],
    )
    .map_err(|e| ShopkeepError::Storage(format!("Failed to save message: {}", e)))?;

    Ok(ChatMessageRow {
        id: conn.last_insert_rowid(),
        session_id,
        message_type,
        content: content.to_string(),
        extra_data: extra_data.cloned(),
        timestamp: epoch_to_utc(now),
    })
}

fn touch_session(conn: &Connection, session_id: i64) -> Result<(), ShopkeepError> {
    conn.execute(
        "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
        rusqlite::params![Utc::now().timestamp(), session_id],
    )
    .map_err(|e| ShopkeepError::Storage(format!("Failed to touch session: {}", e)))?;
    Ok(())
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<ChatSessionRow> {
    Ok(ChatSessionRow {
        id: row.get(0)?,
        session_token: row.get(1)?,
        created_at: epoch_to_utc(row.get(2)?),
        updated_at: epoch_to_utc(row.get(3)?),
        is_active: row.get::<_, i64>(4)? != 0,
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<ChatMessageRow> {
    let kind: String = row.get(2)?;
    let extra: Option<String> = row.get(4)?;
    Ok(ChatMessageRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        message_type: MessageType::parse(&kind),
        content: row.get(3)?,
        // Rows written by this repository always hold valid JSON.
        extra_data: extra.and_then(|s| serde_json::from_str(&s).ok()),
        timestamp: epoch_to_utc(row.get(5)?),
    })
}

fn epoch_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn repo() -> ChatSessionRepository {
        ChatSessionRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_create_session_has_uuid_token() {
        let repo = repo();
        let session = repo.create().unwrap();
        assert!(session.is_active);
        assert!(Uuid::parse_str(&session.session_token).is_ok());
    }

    #[test]
    fn test_get_or_create_resumes_active_session() {
        let repo = repo();
        let first = repo.get_or_create(None).unwrap();
        let again = repo
            .get_or_create(Some(first.session_token.as_str()))
            .unwrap();
        assert_eq!(first.id, again.id);
    }

    #[test]
    fn test_get_or_create_unknown_token_starts_new() {
        let repo = repo();
        let session = repo.get_or_create(Some("no-such-token")).unwrap();
        assert_ne!(session.session_token, "no-such-token");
    }

    #[test]
    fn test_get_or_create_after_reset_starts_new() {
        let repo = repo();
        let first = repo.create().unwrap();
        assert!(repo.deactivate(&first.session_token).unwrap());
        let next = repo
            .get_or_create(Some(first.session_token.as_str()))
            .unwrap();
        assert_ne!(first.id, next.id);
    }

    #[test]
    fn test_deactivate_unknown_token() {
        assert!(!repo().deactivate("missing").unwrap());
    }

    #[test]
    fn test_history_in_write_order_with_metadata() {
        let repo = repo();
        let session = repo.create().unwrap();
        repo.append_message(session.id, MessageType::User, "hello", None)
            .unwrap();
        let meta = json!({"type": "greeting"});
        repo.append_message(session.id, MessageType::Bot, "Hi there!", Some(&meta))
            .unwrap();

        let history = repo.history(session.id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message_type, MessageType::User);
        assert_eq!(history[0].content, "hello");
        assert!(history[0].extra_data.is_none());
        assert_eq!(history[1].message_type, MessageType::Bot);
        assert_eq!(history[1].extra_data, Some(meta));
    }

    #[test]
    fn test_history_isolated_per_session() {
        let repo = repo();
        let a = repo.create().unwrap();
        let b = repo.create().unwrap();
        repo.append_message(a.id, MessageType::User, "a", None).unwrap();
        assert!(repo.history(b.id).unwrap().is_empty());
    }

    #[test]
    fn test_list_paginates_and_clamps() {
        let repo = repo();
        for _ in 0..5 {
            repo.create().unwrap();
        }
        let page = repo.list(1, 2).unwrap();
        assert_eq!(page.sessions.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.pages(), 3);

        let last = repo.list(3, 2).unwrap();
        assert_eq!(last.sessions.len(), 1);

        let clamped = repo.list(0, 1000).unwrap();
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, MAX_PER_PAGE);
    }

    #[test]
    fn test_list_most_recent_first() {
        let repo = repo();
        let older = repo.create().unwrap();
        let newer = repo.create().unwrap();
        let page = repo.list(1, 10).unwrap();
        assert_eq!(page.sessions[0].id, newer.id);
        assert_eq!(page.sessions[1].id, older.id);
    }

    #[test]
    fn test_record_turn_writes_both_messages() {
        let repo = repo();
        let meta = json!({"type": "greeting"});
        let record = repo.record_turn(None, "hello", "Hi there!", &meta).unwrap();
        assert!(record.session.is_active);
        assert_eq!(record.user_message.message_type, MessageType::User);
        assert_eq!(record.bot_message.extra_data, Some(meta.clone()));

        let again = repo
            .record_turn(Some(record.session.session_token.as_str()), "bye", "Bye!", &meta)
            .unwrap();
        assert_eq!(again.session.id, record.session.id);
        assert_eq!(repo.history(record.session.id).unwrap().len(), 4);
    }

    #[test]
    fn test_record_turn_failure_stores_nothing() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_bot BEFORE INSERT ON chat_messages
                 WHEN NEW.message_type = 'bot'
                 BEGIN SELECT RAISE(ABORT, 'bot writes disabled'); END;",
            )
            .map_err(|e| ShopkeepError::Storage(e.to_string()))
        })
        .unwrap();
        let repo = ChatSessionRepository::new(Arc::clone(&db));

        let err = repo
            .record_turn(None, "hello", "Hi there!", &json!({"type": "greeting"}))
            .unwrap_err();
        assert!(err.to_string().contains("bot writes disabled"));
        assert_eq!(repo.list(1, 10).unwrap().total, 0);
        let messages: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))
                    .map_err(|e| ShopkeepError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(messages, 0);
    }

    #[test]
    fn test_find_active_skips_reset_sessions() {
        let repo = repo();
        let session = repo.create().unwrap();
        let token = session.session_token.as_str();
        assert_eq!(repo.find_active(Some(token)).unwrap().map(|s| s.id), Some(session.id));
        repo.deactivate(token).unwrap();
        assert!(repo.find_active(Some(token)).unwrap().is_none());
        assert!(repo.find_active(None).unwrap().is_none());
    }
}
