//! SQLite-backed catalog store.
//!
//! Implements [`CatalogReader`] over the `products` and `categories` tables
//! with simple text and equality filters. Inactive rows are never returned.

use std::sync::Arc;

use rusqlite::types::ToSql;
use rusqlite::Row;

use shopkeep_core::catalog::{CatalogReader, CategorySummary, ProductSummary};
use shopkeep_core::error::ShopkeepError;

use crate::db::Database;

/// Read-only catalog queries for the chat pipeline.
pub struct CatalogStore {
    db: Arc<Database>,
}

impl CatalogStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl CatalogReader for CatalogStore {
    fn find_products(
        &self,
        terms: &[String],
        limit: usize,
    ) -> Result<Vec<ProductSummary>, ShopkeepError> {
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        let mut conditions: Vec<String> = Vec::new();

        for term in terms.iter().filter(|t| !t.is_empty()) {
            params.push(Box::new(like_pattern(term)));
            let idx = params.len();
            conditions.push(format!(
                r"name LIKE ?{idx} ESCAPE '\' OR description LIKE ?{idx} ESCAPE '\'"
            ));
        }

        let text_filter = if conditions.is_empty() {
            String::new()
        } else {
            format!(" AND ({})", conditions.join(" OR "))
        };

        params.push(Box::new(limit as i64));
        let sql = format!(
            "SELECT id, name, description, price, image_url
             FROM products
             WHERE is_active = 1{}
             ORDER BY id ASC
             LIMIT ?{}",
            text_filter,
            params.len()
        );

        self.db.with_conn(|conn| {
            let param_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let mut stmt = conn
                .prepare(&sql)
                .map_err(|e| ShopkeepError::Storage(format!("Product search prepare: {}", e)))?;

            let rows = stmt
                .query_map(param_refs.as_slice(), row_to_product)
                .map_err(|e| ShopkeepError::Storage(format!("Product search: {}", e)))?;

            let mut products = Vec::new();
            for row in rows {
                products.push(row.map_err(|e| ShopkeepError::Storage(e.to_string()))?);
            }
            Ok(products)
        })
    }

    fn list_categories(&self) -> Result<Vec<CategorySummary>, ShopkeepError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, name, description
                     FROM categories
                     WHERE is_active = 1
                     ORDER BY id ASC",
                )
                .map_err(|e| ShopkeepError::Storage(format!("Category query prepare: {}", e)))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(CategorySummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                    })
                })
                .map_err(|e| ShopkeepError::Storage(format!("Category query: {}", e)))?;

            let mut categories = Vec::new();
            for row in rows {
                categories.push(row.map_err(|e| ShopkeepError::Storage(e.to_string()))?);
            }
            Ok(categories)
        })
    }

    fn count_products(&self, category_id: i64) -> Result<u64, ShopkeepError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM products WHERE category_id = ?1 AND is_active = 1",
                    rusqlite::params![category_id],
                    |row| row.get(0),
                )
                .map_err(|e| ShopkeepError::Storage(format!("Product count: {}", e)))?;
            Ok(count.max(0) as u64)
        })
    }
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<ProductSummary> {
    Ok(ProductSummary {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        image_url: row.get(4)?,
    })
}

/// Build a `%term%` LIKE pattern with wildcard characters escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
