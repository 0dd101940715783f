//! Application state shared across all route handlers.
//!
//! AppState holds references to all services and shared resources.
//! It is passed to handlers via axum's State extractor.

use std::sync::Arc;
use std::time::Instant;

use shopkeep_chat::TurnDispatcher;
use shopkeep_core::config::ShopkeepConfig;
use shopkeep_storage::{CatalogStore, ChatSessionRepository, Database};

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ShopkeepConfig>,
    /// SQLite database holding the catalog and chat history.
    pub database: Arc<Database>,
    /// Chat sessions and their messages.
    pub sessions: Arc<ChatSessionRepository>,
    /// Turn pipeline.
    pub dispatcher: Arc<TurnDispatcher>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with an explicitly built dispatcher.
    pub fn new(config: ShopkeepConfig, database: Arc<Database>, dispatcher: TurnDispatcher) -> Self {
        Self {
            sessions: Arc::new(ChatSessionRepository::new(Arc::clone(&database))),
            config: Arc::new(config),
            database,
            dispatcher: Arc::new(dispatcher),
            start_time: Instant::now(),
        }
    }

    /// Build the standard pipeline over the database's catalog.
    pub fn from_config(config: ShopkeepConfig, database: Arc<Database>) -> Self {
        let catalog = Arc::new(CatalogStore::new(Arc::clone(&database)));
        let dispatcher = TurnDispatcher::from_config(catalog, &config);
        Self::new(config, database, dispatcher)
    }
}
