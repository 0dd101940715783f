//! Deterministic sample catalog used by `shopkeep --seed` and by tests.

use rusqlite::Connection;
use tracing::{info, warn};

use shopkeep_core::error::ShopkeepError;

use crate::db::Database;

struct SeedCategory {
    name: &'static str,
    description: &'static str,
    children: &'static [(&'static str, &'static str)],
}

const CATEGORIES: &[SeedCategory] = &[
    SeedCategory {
        name: "Electronics",
        description: "Computers, smartphones, tablets, and electronic accessories",
        children: &[
            ("Smartphones", "Mobile phones and accessories"),
            ("Laptops", "Portable computers and accessories"),
            ("Headphones", "Audio devices and accessories"),
            ("Tablets", "Tablet computers and accessories"),
        ],
    },
    SeedCategory {
        name: "Books",
        description: "Fiction, non-fiction, textbooks, and digital books",
        children: &[
            ("Fiction", "Novels, short stories, and fiction literature"),
            ("Non-Fiction", "Biography, history, science, and educational books"),
            ("Textbooks", "Academic and educational textbooks"),
        ],
    },
    SeedCategory {
        name: "Clothing",
        description: "Fashion and apparel for men, women, and children",
        children: &[
            ("Men's Clothing", "Shirts, pants, jackets, and men's fashion"),
            ("Shoes", "Footwear for all occasions"),
            ("Accessories", "Bags, jewelry, watches, and fashion accessories"),
        ],
    },
    SeedCategory {
        name: "Home & Garden",
        description: "Furniture, appliances, and home improvement items",
        children: &[
            ("Furniture", "Chairs, tables, beds, and home furniture"),
            ("Kitchen", "Kitchen and home appliances"),
            ("Garden", "Gardening tools and outdoor equipment"),
        ],
    },
];

/// (category, name, brand, price, description)
const PRODUCTS: &[(&str, &str, &str, f64, &str)] = &[
    ("Smartphones", "iPhone 15 Pro", "Apple", 999.00, "Smartphone with 128GB storage and a 48MP camera"),
    ("Smartphones", "Samsung Galaxy S24", "Samsung", 849.99, "Android phone with 256GB storage"),
    ("Smartphones", "Google Pixel 8", "Google", 699.00, "Phone with a 50MP camera and clean Android"),
    ("Laptops", "MacBook Air M3", "Apple", 1099.00, "Lightweight laptop with 16GB RAM and 512GB SSD"),
    ("Laptops", "Dell XPS 13", "Dell", 999.00, "Compact laptop with Intel i7 processor"),
    ("Laptops", "ThinkPad X1 Carbon", "Lenovo", 1349.00, "Business laptop with 1TB SSD"),
    ("Headphones", "Sony WH-1000XM5", "Sony", 349.99, "Over-ear noise cancelling headphones"),
    ("Headphones", "AirPods Pro 2", "Apple", 229.00, "Wireless earbuds with noise cancelling"),
    ("Tablets", "iPad Air", "Apple", 599.00, "Tablet with a 10.9 inch display"),
    ("Fiction", "The Silent Patient", "Alex Michaelides", 15.99, "Psychological thriller novel"),
    ("Fiction", "Where the Crawdads Sing", "Delia Owens", 14.50, "Bestselling novel set in the marshlands"),
    ("Non-Fiction", "Atomic Habits", "James Clear", 18.00, "Book about building good habits"),
    ("Textbooks", "Calculus: Early Transcendentals", "Stewart", 129.00, "University calculus textbook"),
    ("Men's Clothing", "Premium Cotton T-Shirt", "Nike", 29.99, "Soft cotton shirt for everyday wear"),
    ("Men's Clothing", "Slim Fit Jeans", "Levi's", 69.50, "Classic slim fit denim jeans"),
    ("Shoes", "Air Max 270", "Nike", 150.00, "Cushioned running shoes"),
    ("Shoes", "Chuck Taylor All Star", "Converse", 60.00, "Canvas high-top shoes"),
    ("Accessories", "Classic Analog Watch", "Timex", 89.00, "Stainless steel wrist watch"),
    ("Furniture", "Ergonomic Office Chair", "Herman Miller", 499.00, "Adjustable chair with lumbar support"),
    ("Kitchen", "Stand Mixer", "KitchenAid", 379.00, "Kitchen mixer with 5 quart bowl"),
    ("Garden", "Cordless Hedge Trimmer", "Bosch", 129.99, "Battery powered garden trimmer"),
];

/// Counts of rows inserted by [`seed_sample_catalog`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub products: usize,
}

/// Insert the sample catalog unless categories already exist.
///
/// Returns the number of rows inserted (zero when skipped).
pub fn seed_sample_catalog(db: &Database) -> Result<SeedSummary, ShopkeepError> {
    let summary = db.with_transaction(|tx| {
        let existing: i64 = tx
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .map_err(|e| ShopkeepError::Storage(format!("Seed check: {}", e)))?;
        if existing > 0 {
            info!(existing, "Catalog already populated, skipping seed");
            return Ok(SeedSummary::default());
        }

        let mut summary = SeedSummary::default();

        for category in CATEGORIES {
            tx.execute(
                "INSERT INTO categories (name, description) VALUES (?1, ?2)",
                rusqlite::params![category.name, category.description],
            )
            .map_err(|e| ShopkeepError::Storage(format!("Seed category: {}", e)))?;
            let parent_id = tx.last_insert_rowid();
            summary.categories += 1;

            for (name, description) in category.children {
                tx.execute(
                    "INSERT INTO categories (name, description, parent_id) VALUES (?1, ?2, ?3)",
                    rusqlite::params![name, description, parent_id],
                )
                .map_err(|e| ShopkeepError::Storage(format!("Seed subcategory: {}", e)))?;
                summary.categories += 1;
            }
        }

        for (idx, product) in PRODUCTS.iter().enumerate() {
            summary.products += insert_product(tx, idx + 1, product)?;
        }

        Ok(summary)
    })?;

    if summary != SeedSummary::default() {
        info!(
            categories = summary.categories,
            products = summary.products,
            "Sample catalog seeded"
        );
    }
    Ok(summary)
}

/// Insert one product under the category named in `product`.
///
/// Returns the number of rows written, which is zero when that category
/// does not exist.
fn insert_product(
    conn: &Connection,
    sku: usize,
    (category, name, brand, price, description): &(&str, &str, &str, f64, &str),
) -> Result<usize, ShopkeepError> {
    let image_url = format!(
        "https://via.placeholder.com/400x400?text={}",
        name.replace(' ', "+")
    );
    let inserted = conn
        .execute(
            "INSERT INTO products
                (name, description, price, category_id, brand, sku, stock_quantity, image_url)
             SELECT ?1, ?2, ?3, id, ?4, ?5, ?6, ?7 FROM categories WHERE name = ?8",
            rusqlite::params![
                name,
                description,
                price,
                brand,
                format!("SKU-{:08}", sku),
                ((sku - 1) * 7 % 50 + 5) as i64,
                image_url,
                category,
            ],
        )
        .map_err(|e| ShopkeepError::Storage(format!("Seed product: {}", e)))?;
    if inserted == 0 {
        warn!(product = %name, category = %category, "Seed product skipped, unknown category");
    }
    Ok(inserted)
}
