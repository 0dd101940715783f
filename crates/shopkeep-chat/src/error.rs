//! Error types for the turn-processing pipeline.

use shopkeep_core::error::ShopkeepError;

/// Errors from the chat pipeline.
///
/// Only [`ChatError::Validation`] ever escapes [`crate::TurnDispatcher::handle`];
/// every other variant is turned into an `error` or `fallback` reply before
/// it reaches the caller.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("invalid message: {0}")]
    Validation(String),
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),
    #[error("generative model is not configured")]
    GenerativeUnavailable,
    #[error("generative call failed: {0}")]
    GenerativeCallFailed(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ChatError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ChatError::Validation(_))
    }
}

impl From<ShopkeepError> for ChatError {
    fn from(err: ShopkeepError) -> Self {
        ChatError::CatalogUnavailable(err.to_string())
    }
}
