//! Shopify Admin API client: the paginated source-data reader behind the
//! reconciliation engine.

mod client;
mod error;
mod types;

pub use client::{ShopifyAdminClient, DEFAULT_API_VERSION};
pub use error::{Result, ShopifyClientError};
