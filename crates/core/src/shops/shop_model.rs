//! Shop domain model and repository contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::EntityType;
use crate::Result;

/// One installed merchant shop.
///
/// Owns all sync state for its domain: sync records, run logs and queued
/// jobs cascade away when the shop row is deleted on uninstall.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: String,
    pub shop_domain: String,
    pub access_token: String,
    /// Credential for the external platform's bulk upsert API. Absent until
    /// the merchant connects the platform in app settings.
    pub platform_api_key: Option<String>,
    pub customers_sync_enabled: bool,
    pub orders_sync_enabled: bool,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shop {
    pub fn sync_enabled(&self, entity_type: EntityType) -> bool {
        match entity_type {
            EntityType::Customer => self.customers_sync_enabled,
            EntityType::Order => self.orders_sync_enabled,
        }
    }
}

/// Insert/update payload for a shop, keyed by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShop {
    pub shop_domain: String,
    pub access_token: String,
    pub platform_api_key: Option<String>,
    pub customers_sync_enabled: bool,
    pub orders_sync_enabled: bool,
}

impl NewShop {
    /// New shop with both entity types enabled.
    pub fn new(
        shop_domain: impl Into<String>,
        access_token: impl Into<String>,
        platform_api_key: Option<String>,
    ) -> Self {
        NewShop {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            platform_api_key,
            customers_sync_enabled: true,
            orders_sync_enabled: true,
        }
    }
}

#[async_trait]
pub trait ShopRepositoryTrait: Send + Sync {
    async fn get_by_domain(&self, shop_domain: &str) -> Result<Option<Shop>>;

    /// Inserts the shop or updates the existing row for the same domain.
    /// The row id and `installed_at` survive re-installs.
    async fn upsert(&self, shop: NewShop) -> Result<Shop>;

    /// Removes the shop and, by cascade, everything it owns.
    async fn delete_by_domain(&self, shop_domain: &str) -> Result<usize>;
}
