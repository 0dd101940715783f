pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{CatalogReader, CategorySummary, ProductSummary};
pub use config::ShopkeepConfig;
pub use error::{Result, ShopkeepError};
