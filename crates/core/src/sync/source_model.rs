//! Source-system entity shapes and the paginated read contract.
//!
//! These are the validated forms of what the source's GraphQL API returns;
//! the client crate owns the raw wire DTOs and converts into these at the
//! boundary. Money amounts stay as the source's string decimals until the
//! platform transform parses them.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Credential pair a job carries for reading one shop's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopCredentials {
    pub shop_domain: String,
    pub access_token: String,
}

/// One page of a cursor-paginated source query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePage<T> {
    pub nodes: Vec<T>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceAddress {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCustomer {
    /// Source-global id, e.g. "gid://shopify/Customer/123".
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub default_address: Option<SourceAddress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLineItem {
    pub title: String,
    pub quantity: i64,
    /// String decimal, e.g. "19.90".
    pub price: Option<String>,
}

/// Reference to the customer an order belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCustomerRef {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOrder {
    /// Source-global id, e.g. "gid://shopify/Order/123".
    pub id: String,
    /// Merchant-facing order number, e.g. "#1001".
    pub name: Option<String>,
    pub email: Option<String>,
    pub currency_code: Option<String>,
    /// String decimals as supplied by the source.
    pub total_price: Option<String>,
    pub subtotal_price: Option<String>,
    pub total_tax: Option<String>,
    pub customer: Option<SourceCustomerRef>,
    pub shipping_address: Option<SourceAddress>,
    pub line_items: Vec<SourceLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the reconciliation loop needs from any source entity.
pub trait SourceEntity {
    fn entity_id(&self) -> &str;
    fn source_updated_at(&self) -> DateTime<Utc>;
}

impl SourceEntity for SourceCustomer {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn source_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl SourceEntity for SourceOrder {
    fn entity_id(&self) -> &str {
        &self.id
    }

    fn source_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Paginated read access to one shop's customers and orders.
///
/// The count queries are advisory progress hints: they may drift while a
/// long run pages through the data and never drive correctness.
#[async_trait]
pub trait ShopDataClientTrait: Send + Sync {
    async fn customer_count(&self, credentials: &ShopCredentials) -> Result<i64>;

    async fn order_count(&self, credentials: &ShopCredentials) -> Result<i64>;

    async fn customers_page(
        &self,
        credentials: &ShopCredentials,
        page_size: i64,
        cursor: Option<&str>,
    ) -> Result<SourcePage<SourceCustomer>>;

    async fn orders_page(
        &self,
        credentials: &ShopCredentials,
        page_size: i64,
        cursor: Option<&str>,
    ) -> Result<SourcePage<SourceOrder>>;
}
