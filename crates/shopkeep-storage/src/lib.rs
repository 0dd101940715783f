//! Shopkeep storage crate - SQLite persistence for the catalog and chat.
//!
//! Provides a WAL-mode SQLite database with migrations, the catalog store
//! consumed by the chat pipeline, the chat session/message repository, and
//! a deterministic sample catalog seed.

pub mod catalog;
pub mod db;
pub mod migrations;
pub mod seed;
pub mod sessions;

pub use catalog::CatalogStore;
pub use db::Database;
pub use seed::{seed_sample_catalog, SeedSummary};
pub use sessions::{
    ChatMessageRow, ChatSessionRepository, ChatSessionRow, MessageType, SessionPage, TurnRecord,
};
