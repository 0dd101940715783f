//! One handler per [`Intent`], looked up through a [`HandlerRegistry`].
//!
//! Handlers absorb catalog and generative failures themselves and answer with
//! an `error` or `fallback` reply, so every turn ends with readable text.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use shopkeep_core::catalog::CatalogReader;
use shopkeep_core::config::ChatConfig;

use crate::catalog::CatalogQueryAdapter;
use crate::error::ChatError;
use crate::generative::GenerativeFallbackClient;
use crate::keywords::KeywordExtractor;
use crate::summarizer::ContextSummarizer;
use crate::types::{Intent, Reply, ReplyKind};

/// One unit of conversation: the raw message and its session.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    pub message: &'a str,
    /// Stored session id, or 0 when this turn opens a new session.
    pub session_id: i64,
}

#[async_trait]
pub trait IntentHandler: Send + Sync {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ChatError>;
}

// =============================================================================
// Static replies
// =============================================================================

const GREETING: &str = "Hello! Welcome to our store! I'm your shopping assistant. \
     I can help you find products, browse categories, and answer questions. \
     What are you looking for today?";

const PRODUCT_DETAILS: &str = "I'd love to help with product details! Open any product in \
     our catalog to see its full specifications, or ask me about a specific product by name, \
     like 'tell me about the iPhone 15'.";

const ADD_TO_CART: &str = "To add items to your cart, click the 'Add to Cart' button on any \
     product page, or tell me exactly which product you want and I'll help you find it first!";

const HELP: &str = "I'm here to help you shop! Here's what I can do:\n\
     \n\
     - **Search Products**: ask me to find laptops, smartphones, books and more\n\
     - **Browse Categories**: say 'show categories' to see every product type\n\
     - **Product Advice**: ask 'what's the best laptop under $1000?'\n\
     - **Shopping Help**: I can guide you through adding items to your cart\n\
     - **Order Assistance**: help with placing and tracking orders\n\
     \n\
     Just ask me anything about our products!";

const GOODBYE: &str = "Thank you for shopping with us! If you need anything else, just ask. \
     Have a great day!";

const CAPABILITIES: [&str; 5] = ["search", "browse", "recommend", "cart_help", "order_help"];

/// Returns the same reply for every turn.
pub struct StaticReplyHandler {
    reply: Reply,
}

impl StaticReplyHandler {
    pub fn new(reply: Reply) -> Self {
        Self { reply }
    }

    pub fn greeting() -> Self {
        Self::new(Reply::new(ReplyKind::Greeting, GREETING))
    }

    pub fn product_details() -> Self {
        Self::new(Reply::new(ReplyKind::ProductDetailsRequest, PRODUCT_DETAILS))
    }

    pub fn add_to_cart() -> Self {
        Self::new(Reply::new(ReplyKind::AddToCartGuidance, ADD_TO_CART))
    }

    pub fn help() -> Self {
        Self::new(Reply::new(ReplyKind::Help, HELP).with("capabilities", CAPABILITIES.to_vec()))
    }

    pub fn goodbye() -> Self {
        Self::new(Reply::new(ReplyKind::Goodbye, GOODBYE))
    }
}

#[async_trait]
impl IntentHandler for StaticReplyHandler {
    async fn handle(&self, _turn: &Turn<'_>) -> Result<Reply, ChatError> {
        Ok(self.reply.clone())
    }
}

// =============================================================================
// Product search
// =============================================================================

pub struct ProductSearchHandler {
    catalog: CatalogQueryAdapter,
    extractor: KeywordExtractor,
    fetch_limit: usize,
    display_limit: usize,
}

impl ProductSearchHandler {
    pub fn new(catalog: CatalogQueryAdapter, fetch_limit: usize, display_limit: usize) -> Self {
        Self {
            catalog,
            extractor: KeywordExtractor::new(),
            fetch_limit,
            display_limit,
        }
    }
}

#[async_trait]
impl IntentHandler for ProductSearchHandler {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ChatError> {
        let terms = self.extractor.extract(turn.message);
        if terms.is_empty() {
            return Ok(Reply::new(
                ReplyKind::SearchClarification,
                "I'd be happy to help you find products! Could you tell me what specific item \
                 you're looking for? For example, 'laptops', 'smartphones' or 'books'.",
            ));
        }

        let products = match self.catalog.find_products(&terms, self.fetch_limit).await {
            Ok(products) => products,
            Err(e) => {
                warn!(session_id = turn.session_id, error = %e, "Product search failed");
                return Ok(Reply::new(
                    ReplyKind::Error,
                    "Sorry, I couldn't search our catalog right now. Please try again in a moment.",
                )
                .with("search_terms", terms)
                .with("error", e.to_string()));
            }
        };

        let joined = terms.join(" ");
        if products.is_empty() {
            return Ok(Reply::new(
                ReplyKind::NoResults,
                format!(
                    "I couldn't find any products matching '{}'. Try searching for categories \
                     like electronics, books, clothing, or home & garden items.",
                    joined
                ),
            )
            .with("search_terms", terms));
        }

        let shown = &products[..products.len().min(self.display_limit)];
        let mut content = format!("Here's what I found for '{}':\n\n", joined);
        for product in shown {
            content.push_str(&format!("- **{}** - ${:.2}\n", product.name, product.price));
        }
        if products.len() > shown.len() {
            content.push_str(&format!(
                "\n...and {} more. Try a more specific search to narrow it down.\n",
                products.len() - shown.len()
            ));
        }
        content.push_str(
            "\nWould you like more details about any of these, or should I search for something else?",
        );

        let listed: Vec<Value> = shown
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "name": p.name,
                    "price": p.price,
                    "image_url": p.image_url,
                })
            })
            .collect();

        Ok(Reply::new(ReplyKind::ProductSearchResults, content)
            .with("products", listed)
            .with("search_terms", terms))
    }
}

// =============================================================================
// Category browse
// =============================================================================

pub struct CategoryBrowseHandler {
    catalog: CatalogQueryAdapter,
}

impl CategoryBrowseHandler {
    pub fn new(catalog: CatalogQueryAdapter) -> Self {
        Self { catalog }
    }

    fn unavailable() -> Reply {
        Reply::new(
            ReplyKind::Error,
            "Sorry, I couldn't load our product categories right now. Please try again later.",
        )
    }
}

#[async_trait]
impl IntentHandler for CategoryBrowseHandler {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ChatError> {
        let categories = match self.catalog.categories_with_counts(None).await {
            Ok(categories) => categories,
            Err(e) => {
                warn!(session_id = turn.session_id, error = %e, "Category listing failed");
                return Ok(Self::unavailable().with("error", e.to_string()));
            }
        };
        if categories.is_empty() {
            return Ok(Self::unavailable());
        }

        let mut content = String::from("Here are our product categories:\n\n");
        for entry in &categories {
            content.push_str(&format!(
                "- **{}** ({} items)\n  {}\n",
                entry.category.name, entry.product_count, entry.category.description
            ));
        }
        content.push_str("\nWhich category would you like to explore?");

        let listed: Vec<Value> = categories
            .iter()
            .map(|c| {
                json!({
                    "id": c.category.id,
                    "name": c.category.name,
                    "description": c.category.description,
                    "product_count": c.product_count,
                })
            })
            .collect();

        Ok(Reply::new(ReplyKind::CategoryList, content).with("categories", listed))
    }
}

// =============================================================================
// General (generative fallback)
// =============================================================================

const GENERATIVE_UNAVAILABLE: &str = "I'm sorry, I'm having trouble understanding that right \
     now. Could you try asking about our products or categories, or say 'help' to see what I \
     can do?";

const GENERATIVE_FAILED: &str = "I'm having trouble processing that request right now. Could \
     you try asking about specific products or categories? For example, 'show me laptops' or \
     'do you have smartphones?'";

pub struct GeneralHandler {
    summarizer: ContextSummarizer,
    generative: GenerativeFallbackClient,
}

impl GeneralHandler {
    pub fn new(summarizer: ContextSummarizer, generative: GenerativeFallbackClient) -> Self {
        Self {
            summarizer,
            generative,
        }
    }

    fn fallback() -> Reply {
        Reply::new(ReplyKind::Fallback, GENERATIVE_UNAVAILABLE)
            .with("reason", "generative_unavailable")
    }
}

#[async_trait]
impl IntentHandler for GeneralHandler {
    async fn handle(&self, turn: &Turn<'_>) -> Result<Reply, ChatError> {
        if !self.generative.is_available() {
            return Ok(Self::fallback());
        }

        let context = self.summarizer.summarize().await;
        match self.generative.complete(turn.message, &context).await {
            Ok(text) => Ok(Reply::new(ReplyKind::GenerativeResponse, text)
                .with("query", turn.message)),
            Err(ChatError::GenerativeUnavailable) => Ok(Self::fallback()),
            Err(e) => {
                warn!(session_id = turn.session_id, error = %e, "Generative fallback failed");
                Ok(Reply::new(ReplyKind::Error, GENERATIVE_FAILED).with("error", e.to_string()))
            }
        }
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Explicit intent → handler map.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Intent, Arc<dyn IntentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every intent wired to its standard handler.
    pub fn standard(
        catalog: Arc<dyn CatalogReader>,
        generative: GenerativeFallbackClient,
        config: &ChatConfig,
    ) -> Self {
        let catalog = CatalogQueryAdapter::with_timeout(catalog, config.catalog_timeout());
        let summarizer = ContextSummarizer::new(
            catalog.clone(),
            config.context_category_limit,
            config.context_product_limit,
        );

        let mut registry = Self::new();
        registry.register(Intent::Greeting, StaticReplyHandler::greeting());
        registry.register(
            Intent::SearchProduct,
            ProductSearchHandler::new(
                catalog.clone(),
                config.search_fetch_limit,
                config.search_display_limit,
            ),
        );
        registry.register(Intent::CategoryBrowse, CategoryBrowseHandler::new(catalog));
        registry.register(Intent::ProductDetails, StaticReplyHandler::product_details());
        registry.register(Intent::AddToCart, StaticReplyHandler::add_to_cart());
        registry.register(Intent::Help, StaticReplyHandler::help());
        registry.register(Intent::Goodbye, StaticReplyHandler::goodbye());
        registry.register(Intent::General, GeneralHandler::new(summarizer, generative));
        registry
    }

    pub fn register(&mut self, intent: Intent, handler: impl IntentHandler + 'static) {
        self.handlers.insert(intent, Arc::new(handler));
    }

    pub fn get(&self, intent: Intent) -> Option<&Arc<dyn IntentHandler>> {
        self.handlers.get(&intent)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
