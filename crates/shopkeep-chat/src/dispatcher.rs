//! Turn dispatcher: validates a message, classifies it and runs its handler.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{error, info};

use shopkeep_core::catalog::CatalogReader;
use shopkeep_core::config::ShopkeepConfig;

use crate::classifier::IntentClassifier;
use crate::error::ChatError;
use crate::generative::GenerativeFallbackClient;
use crate::handlers::{HandlerRegistry, Turn};
use crate::types::{Reply, ReplyKind};

const INTERNAL_ERROR: &str = "Sorry, something went wrong while handling your message. \
     Please try again, or say 'help' to see what I can do.";

/// Runs one turn of the conversation.
///
/// Holds only read-only state, so one instance serves concurrent turns.
pub struct TurnDispatcher {
    classifier: IntentClassifier,
    registry: HandlerRegistry,
    max_message_length: usize,
}

impl TurnDispatcher {
    pub fn new(registry: HandlerRegistry, max_message_length: usize) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            registry,
            max_message_length,
        }
    }

    /// Standard pipeline over `catalog`, with the generative client built
    /// from `[generative]`.
    pub fn from_config(catalog: Arc<dyn CatalogReader>, config: &ShopkeepConfig) -> Self {
        let generative = GenerativeFallbackClient::from_config(&config.generative);
        Self::with_generative(catalog, generative, config)
    }

    pub fn with_generative(
        catalog: Arc<dyn CatalogReader>,
        generative: GenerativeFallbackClient,
        config: &ShopkeepConfig,
    ) -> Self {
        let registry = HandlerRegistry::standard(catalog, generative, &config.chat);
        Self::new(registry, config.chat.max_message_length)
    }

    /// Produce the reply for `message`.
    ///
    /// Fails only with [`ChatError::Validation`]; every other fault becomes
    /// an `error` reply.
    pub async fn handle(&self, message: &str, session_id: i64) -> Result<Reply, ChatError> {
        self.validate(message)?;

        let intent = self.classifier.classify(message.trim());
        let turn = Turn {
            message,
            session_id,
        };

        let result = match self.registry.get(intent) {
            Some(handler) => AssertUnwindSafe(handler.handle(&turn))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(ChatError::Internal(format!(
                        "handler panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                }),
            None => Err(ChatError::Internal(format!(
                "no handler registered for intent {}",
                intent
            ))),
        };

        let reply = result.unwrap_or_else(|e| {
            error!(session_id, intent = %intent, error = %e, "Turn handler failed");
            Reply::new(ReplyKind::Error, INTERNAL_ERROR).with("details", e.to_string())
        });

        info!(
            session_id,
            intent = %intent,
            reply_type = reply.reply_type(),
            "Turn handled"
        );
        Ok(reply)
    }

    /// Reject blank messages and messages longer than the configured limit
    /// (counted in characters).
    pub fn validate(&self, message: &str) -> Result<(), ChatError> {
        if message.trim().is_empty() {
            return Err(ChatError::Validation(
                "message cannot be empty".to_string(),
            ));
        }
        let length = message.chars().count();
        if length > self.max_message_length {
            return Err(ChatError::Validation(format!(
                "message exceeds maximum length of {} characters",
                self.max_message_length
            )));
        }
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
