//! Database model for installed shops.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shopsync_core::shops::Shop;

use crate::timestamps;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::shops)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ShopDB {
    pub id: String,
    pub shop_domain: String,
    pub access_token: String,
    pub platform_api_key: Option<String>,
    pub customers_sync_enabled: i32,
    pub orders_sync_enabled: i32,
    pub installed_at: String,
    pub updated_at: String,
}

impl From<ShopDB> for Shop {
    fn from(row: ShopDB) -> Self {
        Shop {
            id: row.id,
            shop_domain: row.shop_domain,
            access_token: row.access_token,
            platform_api_key: row.platform_api_key,
            customers_sync_enabled: row.customers_sync_enabled != 0,
            orders_sync_enabled: row.orders_sync_enabled != 0,
            installed_at: timestamps::parse(&row.installed_at),
            updated_at: timestamps::parse(&row.updated_at),
        }
    }
}
