use shopsync_core::shops::{NewShop, Shop, ShopRepositoryTrait};
use shopsync_core::Result;

use super::model::ShopDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::shops;
use crate::schema::shops::dsl::*;
use crate::timestamps;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;
use uuid::Uuid;

pub struct ShopRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl ShopRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        ShopRepository { pool, writer }
    }

    pub fn get_by_domain_impl(&self, domain: &str) -> Result<Option<Shop>> {
        let mut conn = get_connection(&self.pool)?;
        let row = shops
            .filter(shop_domain.eq(domain))
            .first::<ShopDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(Shop::from))
    }
}

#[async_trait]
impl ShopRepositoryTrait for ShopRepository {
    async fn get_by_domain(&self, domain: &str) -> Result<Option<Shop>> {
        self.get_by_domain_impl(domain)
    }

    async fn upsert(&self, new_shop: NewShop) -> Result<Shop> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Shop> {
                let now = timestamps::format(&Utc::now());
                let row = ShopDB {
                    id: Uuid::new_v4().to_string(),
                    shop_domain: new_shop.shop_domain,
                    access_token: new_shop.access_token,
                    platform_api_key: new_shop.platform_api_key,
                    customers_sync_enabled: new_shop.customers_sync_enabled as i32,
                    orders_sync_enabled: new_shop.orders_sync_enabled as i32,
                    installed_at: now.clone(),
                    updated_at: now,
                };
                // On re-install the stored id and installed_at win.
                let stored = diesel::insert_into(shops::table)
                    .values(&row)
                    .on_conflict(shop_domain)
                    .do_update()
                    .set((
                        access_token.eq(&row.access_token),
                        platform_api_key.eq(&row.platform_api_key),
                        customers_sync_enabled.eq(row.customers_sync_enabled),
                        orders_sync_enabled.eq(row.orders_sync_enabled),
                        updated_at.eq(&row.updated_at),
                    ))
                    .returning(ShopDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;
                Ok(Shop::from(stored))
            })
            .await
    }

    async fn delete_by_domain(&self, domain: &str) -> Result<usize> {
        let domain = domain.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let affected = diesel::delete(shops.filter(shop_domain.eq(domain)))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(affected)
            })
            .await
    }
}
