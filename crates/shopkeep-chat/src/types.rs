//! Shared types for the turn pipeline: intents, reply kinds and replies.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classified purpose of a user message. Exactly one per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    SearchProduct,
    CategoryBrowse,
    ProductDetails,
    AddToCart,
    Help,
    Goodbye,
    General,
}

impl Intent {
    pub const ALL: [Intent; 8] = [
        Intent::Greeting,
        Intent::SearchProduct,
        Intent::CategoryBrowse,
        Intent::ProductDetails,
        Intent::AddToCart,
        Intent::Help,
        Intent::Goodbye,
        Intent::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::SearchProduct => "search_product",
            Intent::CategoryBrowse => "category_browse",
            Intent::ProductDetails => "product_details",
            Intent::AddToCart => "add_to_cart",
            Intent::Help => "help",
            Intent::Goodbye => "goodbye",
            Intent::General => "general",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Branch taken to produce a [`Reply`]; stored as `metadata.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Greeting,
    SearchClarification,
    ProductSearchResults,
    NoResults,
    CategoryList,
    ProductDetailsRequest,
    AddToCartGuidance,
    Help,
    Goodbye,
    GenerativeResponse,
    Fallback,
    Error,
}

impl ReplyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyKind::Greeting => "greeting",
            ReplyKind::SearchClarification => "search_clarification",
            ReplyKind::ProductSearchResults => "product_search_results",
            ReplyKind::NoResults => "no_results",
            ReplyKind::CategoryList => "category_list",
            ReplyKind::ProductDetailsRequest => "product_details_request",
            ReplyKind::AddToCartGuidance => "add_to_cart_guidance",
            ReplyKind::Help => "help",
            ReplyKind::Goodbye => "goodbye",
            ReplyKind::GenerativeResponse => "generative_response",
            ReplyKind::Fallback => "fallback",
            ReplyKind::Error => "error",
        }
    }
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured output of one turn.
///
/// `metadata` always carries a `type` entry naming the [`ReplyKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl Reply {
    pub fn new(kind: ReplyKind, content: impl Into<String>) -> Self {
        let content = content.into();
        debug_assert!(!content.trim().is_empty(), "reply content must not be empty");
        let mut metadata = Map::new();
        metadata.insert("type".to_string(), Value::from(kind.as_str()));
        Self { content, metadata }
    }

    /// Attach an extra metadata field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The `metadata.type` string.
    pub fn reply_type(&self) -> &str {
        self.metadata
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    }

    pub fn is(&self, kind: ReplyKind) -> bool {
        self.reply_type() == kind.as_str()
    }

    /// Metadata as a JSON object value, for persistence.
    pub fn metadata_value(&self) -> Value {
        Value::Object(self.metadata.clone())
    }
}
