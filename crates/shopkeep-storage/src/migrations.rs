//! Database schema migrations.
//!
//! Version 1 creates the catalog tables, version 2 the chat session and
//! message tables.

use rusqlite::Connection;
use tracing::info;

use shopkeep_core::error::ShopkeepError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ShopkeepError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ShopkeepError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ShopkeepError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: catalog");
    }
    if current_version < 2 {
        apply_v2(conn)?;
        info!("Applied migration v2: chat");
    }

    Ok(())
}

/// Version 1: categories and products.
fn apply_v1(conn: &Connection) -> Result<(), ShopkeepError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS categories (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            parent_id   INTEGER REFERENCES categories(id),
            image_url   TEXT,
            is_active   INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS products (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            price           REAL NOT NULL CHECK (price >= 0),
            category_id     INTEGER NOT NULL REFERENCES categories(id),
            brand           TEXT,
            sku             TEXT NOT NULL UNIQUE,
            stock_quantity  INTEGER NOT NULL DEFAULT 0,
            image_url       TEXT,
            is_active       INTEGER NOT NULL DEFAULT 1,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_products_name ON products (name);
        CREATE INDEX IF NOT EXISTS idx_products_category ON products (category_id, is_active);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'catalog');
        ",
    )
    .map_err(|e| ShopkeepError::Storage(format!("Migration v1 failed: {}", e)))
}

/// Version 2: chat sessions and messages.
fn apply_v2(conn: &Connection) -> Result<(), ShopkeepError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            session_token   TEXT NOT NULL UNIQUE,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL,
            is_active       INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_chat_sessions_updated
            ON chat_sessions (updated_at DESC);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id      INTEGER NOT NULL,
            message_type    TEXT NOT NULL CHECK (message_type IN ('user', 'bot')),
            content         TEXT NOT NULL,
            extra_data      TEXT,
            timestamp       INTEGER NOT NULL,
            FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_session
            ON chat_messages (session_id, timestamp ASC);

        INSERT INTO schema_migrations (version, name) VALUES (2, 'chat');
        ",
    )
    .map_err(|e| ShopkeepError::Storage(format!("Migration v2 failed: {}", e)))
}
