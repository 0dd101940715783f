//! Read-only catalog projections and the catalog read contract.
//!
//! The chat pipeline only ever reads the catalog. Storage backends implement
//! [`CatalogReader`]; tests substitute in-memory stubs.

use serde::{Deserialize, Serialize};

use crate::error::ShopkeepError;

/// A product as seen by the chat pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: Option<String>,
}

/// A category as seen by the chat pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// Read access to the product catalog.
///
/// Implementations must be safe to call concurrently from independent turns.
pub trait CatalogReader: Send + Sync {
    /// Active products whose name or description contains any of `terms`
    /// (case-insensitive), in primary-key order, at most `limit` rows.
    ///
    /// An empty `terms` slice applies no text filter.
    fn find_products(
        &self,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<ProductSummary>, ShopkeepError>;

    /// All active categories in primary-key order.
    fn list_categories(&self) -> Result<Vec<CategorySummary>, ShopkeepError>;

    /// Number of active products filed directly under `category_id`.
    fn count_products(&self, category_id: i64) -> Result<u64, ShopkeepError>;
}
