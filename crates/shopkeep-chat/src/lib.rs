//! Turn-processing pipeline for the shop assistant.
//!
//! A [`TurnDispatcher`] validates each message, classifies it with the
//! ordered [`IntentClassifier`] table and runs the matching handler. Product
//! and category handlers read the catalog; unmatched messages go to the
//! [`GenerativeFallbackClient`] with a bounded store digest as context.

pub mod catalog;
pub mod classifier;
pub mod dispatcher;
pub mod error;
pub mod generative;
pub mod handlers;
pub mod keywords;
pub mod summarizer;
pub mod types;

pub use catalog::{CatalogQueryAdapter, CategoryCount};
pub use classifier::IntentClassifier;
pub use dispatcher::TurnDispatcher;
pub use error::ChatError;
pub use generative::{GeminiBackend, GenerativeBackend, GenerativeFallbackClient};
pub use handlers::{HandlerRegistry, IntentHandler, Turn};
pub use keywords::KeywordExtractor;
pub use summarizer::ContextSummarizer;
pub use types::{Intent, Reply, ReplyKind};
