//! HTTP API for the shop assistant.
//!
//! Exposes the chat turn pipeline over axum: posting messages, reading a
//! session's history, listing sessions and resetting a session.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
