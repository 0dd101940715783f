//! Catalog access for the turn pipeline.
//!
//! Reader calls are synchronous and may block on the database lock, so each
//! one runs on the blocking pool under a deadline.

use std::sync::Arc;
use std::time::Duration;

use shopkeep_core::catalog::{CatalogReader, CategorySummary, ProductSummary};
use shopkeep_core::error::ShopkeepError;

use crate::error::ChatError;

/// Deadline used when none is configured.
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(3);

/// A category paired with its live active product count.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCount {
    pub category: CategorySummary,
    pub product_count: u64,
}

/// Wrapper over a [`CatalogReader`] that speaks [`ChatError`] and bounds
/// every read by a timeout.
#[derive(Clone)]
pub struct CatalogQueryAdapter {
    reader: Arc<dyn CatalogReader>,
    timeout: Duration,
}

impl CatalogQueryAdapter {
    pub fn new(reader: Arc<dyn CatalogReader>) -> Self {
        Self::with_timeout(reader, DEFAULT_CATALOG_TIMEOUT)
    }

    pub fn with_timeout(reader: Arc<dyn CatalogReader>, timeout: Duration) -> Self {
        Self { reader, timeout }
    }

    /// Products whose name or description contains any of `terms`,
    /// in catalog order. An empty term list is unfiltered.
    pub async fn find_products(
        &self,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<ProductSummary>, ChatError> {
        let terms = terms.to_vec();
        self.read("find_products", move |reader| {
            reader.find_products(&terms, limit)
        })
        .await
    }

    /// Active categories with their product counts, at most `limit` of them.
    ///
    /// The listing and the counts share one deadline.
    pub async fn categories_with_counts(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<CategoryCount>, ChatError> {
        self.read("categories_with_counts", move |reader| {
            let categories = reader.list_categories()?;
            let take = limit.unwrap_or(categories.len());
            categories
                .into_iter()
                .take(take)
                .map(|category| {
                    let product_count = reader.count_products(category.id)?;
                    Ok::<_, ShopkeepError>(CategoryCount {
                        category,
                        product_count,
                    })
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await
    }

    /// Run `op` against the reader on the blocking pool.
    ///
    /// On expiry the blocking call is left to finish in the background; its
    /// result is discarded.
    async fn read<T, F>(&self, op: &'static str, f: F) -> Result<T, ChatError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CatalogReader) -> Result<T, ShopkeepError> + Send + 'static,
    {
        let reader = Arc::clone(&self.reader);
        let task = tokio::task::spawn_blocking(move || f(reader.as_ref()));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(e)) => Err(ChatError::CatalogUnavailable(format!(
                "{} task failed: {}",
                op, e
            ))),
            Err(_) => Err(ChatError::CatalogUnavailable(format!(
                "{} timed out after {}ms",
                op,
                self.timeout.as_millis()
            ))),
        }
    }
}

impl std::fmt::Debug for CatalogQueryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogQueryAdapter")
            .field("timeout", &self.timeout)
            .finish()
    }
}
