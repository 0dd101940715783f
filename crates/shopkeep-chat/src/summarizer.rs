//! Bounded catalog digest used as context for the generative fallback.

use tracing::warn;

use crate::catalog::CatalogQueryAdapter;
use crate::error::ChatError;

/// Returned when the catalog cannot be read or holds nothing.
pub const STATIC_STORE_DESCRIPTION: &str = "We have a wide variety of products across multiple \
     categories including electronics, books, clothing, and home items.";

/// Builds a short plain-text digest of categories and sample prices.
#[derive(Debug, Clone)]
pub struct ContextSummarizer {
    catalog: CatalogQueryAdapter,
    category_limit: usize,
    product_limit: usize,
}

impl ContextSummarizer {
    pub fn new(catalog: CatalogQueryAdapter, category_limit: usize, product_limit: usize) -> Self {
        Self {
            catalog,
            category_limit,
            product_limit,
        }
    }

    /// Never empty; catalog failures fall back to [`STATIC_STORE_DESCRIPTION`].
    pub async fn summarize(&self) -> String {
        match self.try_summarize().await {
            Ok(Some(digest)) => digest,
            Ok(None) => STATIC_STORE_DESCRIPTION.to_string(),
            Err(e) => {
                warn!(error = %e, "Catalog digest unavailable, using static description");
                STATIC_STORE_DESCRIPTION.to_string()
            }
        }
    }

    async fn try_summarize(&self) -> Result<Option<String>, ChatError> {
        let categories = self
            .catalog
            .categories_with_counts(Some(self.category_limit))
            .await?;
        let products = self.catalog.find_products(&[], self.product_limit).await?;

        if categories.is_empty() && products.is_empty() {
            return Ok(None);
        }

        let mut digest = String::from("STORE CATEGORIES:\n");
        for entry in &categories {
            digest.push_str(&format!(
                "- {}: {} products\n",
                entry.category.name, entry.product_count
            ));
        }
        digest.push_str("\nSAMPLE PRODUCTS:\n");
        for product in &products {
            digest.push_str(&format!("- {}: ${:.2}\n", product.name, product.price));
        }
        Ok(Some(digest))
    }
}
