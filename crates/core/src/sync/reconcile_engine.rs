//! Paginated reconciliation: decide per entity whether to push it to the
//! external platform, advancing sync records write-ahead and persisting run
//! progress after every page.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use super::platform_model::{
    BulkOutcome, ContactPayload, OrderPayload, PlatformClientTrait,
};
use super::source_model::{
    ShopCredentials, ShopDataClientTrait, SourceCustomer, SourceEntity, SourceOrder, SourcePage,
};
use super::sync_state_model::{
    EntityType, RunLogPatch, SyncRecord, SyncRunLog, SyncStateRepositoryTrait, SyncStatus,
};
use crate::{Error, Result};

/// Orders page through the source in chunks of this size.
pub const ORDER_PAGE_SIZE: i64 = 150;

/// Customers carry heavier payloads per node, so they page in smaller chunks.
pub const CUSTOMER_PAGE_SIZE: i64 = 100;

/// Per-page tallies fed into the run log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PageOutcome {
    synced: i64,
    skipped: i64,
    failed: i64,
}

/// Entity-type specifics behind the shared reconciliation loop: how to page,
/// how big a page is, and how marked entities reach the platform. Customers
/// and orders go through the exact same loop by construction.
#[async_trait]
trait EntityPageFlow: Send + Sync {
    type Entity: SourceEntity + Clone + Send + Sync;

    fn page_size(&self) -> i64;

    async fn total_count(&self, credentials: &ShopCredentials) -> Result<i64>;

    async fn fetch_page(
        &self,
        credentials: &ShopCredentials,
        cursor: Option<&str>,
    ) -> Result<SourcePage<Self::Entity>>;

    async fn push_marked(&self, api_key: &str, marked: &[Self::Entity]) -> Result<BulkOutcome>;
}

struct CustomerFlow {
    shop_data: Arc<dyn ShopDataClientTrait>,
    platform: Arc<dyn PlatformClientTrait>,
}

#[async_trait]
impl EntityPageFlow for CustomerFlow {
    type Entity = SourceCustomer;

    fn page_size(&self) -> i64 {
        CUSTOMER_PAGE_SIZE
    }

    async fn total_count(&self, credentials: &ShopCredentials) -> Result<i64> {
        self.shop_data.customer_count(credentials).await
    }

    async fn fetch_page(
        &self,
        credentials: &ShopCredentials,
        cursor: Option<&str>,
    ) -> Result<SourcePage<SourceCustomer>> {
        self.shop_data
            .customers_page(credentials, self.page_size(), cursor)
            .await
    }

    async fn push_marked(&self, api_key: &str, marked: &[SourceCustomer]) -> Result<BulkOutcome> {
        let contacts: Vec<ContactPayload> = marked.iter().map(ContactPayload::from).collect();
        self.platform.upsert_contacts(api_key, &contacts).await
    }
}

struct OrderFlow {
    shop_data: Arc<dyn ShopDataClientTrait>,
    platform: Arc<dyn PlatformClientTrait>,
}

#[async_trait]
impl EntityPageFlow for OrderFlow {
    type Entity = SourceOrder;

    fn page_size(&self) -> i64 {
        ORDER_PAGE_SIZE
    }

    async fn total_count(&self, credentials: &ShopCredentials) -> Result<i64> {
        self.shop_data.order_count(credentials).await
    }

    async fn fetch_page(
        &self,
        credentials: &ShopCredentials,
        cursor: Option<&str>,
    ) -> Result<SourcePage<SourceOrder>> {
        self.shop_data
            .orders_page(credentials, self.page_size(), cursor)
            .await
    }

    async fn push_marked(&self, api_key: &str, marked: &[SourceOrder]) -> Result<BulkOutcome> {
        let orders: Vec<OrderPayload> = marked.iter().map(OrderPayload::from).collect();
        self.platform.upsert_orders(api_key, &orders).await
    }
}

/// Accumulates run counts and persists the run log. `fail` contains an error
/// at run scope: the log flips to ERROR, counts persisted so far survive.
struct RunContext {
    shop_id: String,
    entity_type: EntityType,
    sync_state: Arc<dyn SyncStateRepositoryTrait>,
    synced: i64,
    skipped: i64,
    failed: i64,
}

impl RunContext {
    fn new(
        shop_id: &str,
        entity_type: EntityType,
        sync_state: Arc<dyn SyncStateRepositoryTrait>,
    ) -> Self {
        RunContext {
            shop_id: shop_id.to_string(),
            entity_type,
            sync_state,
            synced: 0,
            skipped: 0,
            failed: 0,
        }
    }

    /// Resets the log to a zero-count IN_PROGRESS run with the advisory total.
    async fn begin(&self, total_count: i64) -> Result<SyncRunLog> {
        let mut patch = RunLogPatch::fresh_run(Utc::now());
        patch.total_count = Some(total_count);
        self.sync_state
            .upsert_run_log(&self.shop_id, self.entity_type, patch)
            .await
    }

    /// Folds one page into the aggregate and persists it, so progress
    /// survives a crash mid-run.
    async fn record_page(&mut self, outcome: PageOutcome) -> Result<SyncRunLog> {
        self.synced += outcome.synced;
        self.skipped += outcome.skipped;
        self.failed += outcome.failed;
        let patch = RunLogPatch {
            synced_count: Some(self.synced),
            skipped_count: Some(self.skipped),
            failed_count: Some(self.failed),
            ..Default::default()
        };
        self.sync_state
            .upsert_run_log(&self.shop_id, self.entity_type, patch)
            .await
    }

    async fn fail(self, err: Error) -> Result<SyncRunLog> {
        error!(
            "[SyncEngine] {} {} run failed: {}",
            self.shop_id,
            self.entity_type.as_str(),
            err
        );
        self.sync_state
            .upsert_run_log(
                &self.shop_id,
                self.entity_type,
                RunLogPatch::status(SyncStatus::Error),
            )
            .await
    }

    async fn complete(self) -> Result<SyncRunLog> {
        info!(
            "[SyncEngine] {} {} run complete: synced={} skipped={} failed={}",
            self.shop_id,
            self.entity_type.as_str(),
            self.synced,
            self.skipped,
            self.failed
        );
        self.sync_state
            .upsert_run_log(
                &self.shop_id,
                self.entity_type,
                RunLogPatch::status(SyncStatus::Complete),
            )
            .await
    }
}

/// Drives one reconciliation run per (shop, entity type).
///
/// All collaborators are injected; the engine holds no per-shop state, so
/// runs for different shops and entity types may execute concurrently.
pub struct ReconciliationEngine {
    shop_data: Arc<dyn ShopDataClientTrait>,
    platform: Arc<dyn PlatformClientTrait>,
    sync_state: Arc<dyn SyncStateRepositoryTrait>,
}

impl ReconciliationEngine {
    pub fn new(
        shop_data: Arc<dyn ShopDataClientTrait>,
        platform: Arc<dyn PlatformClientTrait>,
        sync_state: Arc<dyn SyncStateRepositoryTrait>,
    ) -> Self {
        ReconciliationEngine {
            shop_data,
            platform,
            sync_state,
        }
    }

    /// Visits every source entity of `entity_type` once, pushes the changed
    /// ones to the platform, and returns the final run log.
    ///
    /// Source and platform failures are contained: the run log flips to
    /// ERROR and the accumulated counts stand. `Err` is returned only when
    /// the run log itself cannot be persisted.
    pub async fn run(
        &self,
        shop_id: &str,
        credentials: &ShopCredentials,
        platform_api_key: &str,
        entity_type: EntityType,
    ) -> Result<SyncRunLog> {
        match entity_type {
            EntityType::Customer => {
                let flow = CustomerFlow {
                    shop_data: self.shop_data.clone(),
                    platform: self.platform.clone(),
                };
                self.run_flow(&flow, shop_id, credentials, platform_api_key, entity_type)
                    .await
            }
            EntityType::Order => {
                let flow = OrderFlow {
                    shop_data: self.shop_data.clone(),
                    platform: self.platform.clone(),
                };
                self.run_flow(&flow, shop_id, credentials, platform_api_key, entity_type)
                    .await
            }
        }
    }

    async fn run_flow<F: EntityPageFlow>(
        &self,
        flow: &F,
        shop_id: &str,
        credentials: &ShopCredentials,
        platform_api_key: &str,
        entity_type: EntityType,
    ) -> Result<SyncRunLog> {
        let mut ctx = RunContext::new(shop_id, entity_type, self.sync_state.clone());

        let total_count = match flow.total_count(credentials).await {
            Ok(count) => count,
            Err(err) => return ctx.fail(err).await,
        };
        ctx.begin(total_count).await?;
        debug!(
            "[SyncEngine] {} {} run started, ~{} entities",
            shop_id,
            entity_type.as_str(),
            total_count
        );

        let mut cursor: Option<String> = None;
        loop {
            let page = match flow.fetch_page(credentials, cursor.as_deref()).await {
                Ok(page) => page,
                Err(err) => return ctx.fail(err).await,
            };

            let outcome = match self
                .reconcile_page(flow, shop_id, platform_api_key, &page.nodes)
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => return ctx.fail(err).await,
            };
            ctx.record_page(outcome).await?;

            if !page.has_next_page {
                break;
            }
            match page.end_cursor {
                Some(next_cursor) => cursor = Some(next_cursor),
                None => {
                    warn!(
                        "[SyncEngine] {} {} source reported another page without a cursor, stopping",
                        shop_id,
                        entity_type.as_str()
                    );
                    break;
                }
            }
        }

        ctx.complete().await
    }

    /// One page: batch-lookup prior sync records, mark entities whose source
    /// timestamp is strictly newer, advance their records write-ahead, then
    /// bulk-push the marked set.
    async fn reconcile_page<F: EntityPageFlow>(
        &self,
        flow: &F,
        shop_id: &str,
        platform_api_key: &str,
        nodes: &[F::Entity],
    ) -> Result<PageOutcome> {
        if nodes.is_empty() {
            return Ok(PageOutcome::default());
        }

        let entity_ids: Vec<String> = nodes
            .iter()
            .map(|entity| entity.entity_id().to_string())
            .collect();
        let existing = self
            .sync_state
            .get_sync_records_by_ids(shop_id, &entity_ids)
            .await?;
        let prior_updates: HashMap<&str, DateTime<Utc>> = existing
            .iter()
            .map(|record| (record.entity_id.as_str(), record.updated_at))
            .collect();

        let now = Utc::now();
        let mut marked: Vec<F::Entity> = Vec::new();
        let mut skipped = 0i64;
        for entity in nodes {
            let prior_updated_at = prior_updates
                .get(entity.entity_id())
                .copied()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            // Strict >: an equal timestamp means unchanged.
            if entity.source_updated_at() > prior_updated_at {
                // Write-ahead advance: the record moves to the new timestamp
                // before the push, so an immediate retry cannot re-push it.
                let record = SyncRecord {
                    entity_id: entity.entity_id().to_string(),
                    created_at: now,
                    updated_at: entity.source_updated_at(),
                    shop_id: shop_id.to_string(),
                };
                self.sync_state.upsert_sync_record(&record).await?;
                marked.push(entity.clone());
            } else {
                skipped += 1;
            }
        }

        let mut failed = 0i64;
        if !marked.is_empty() {
            let outcome = flow.push_marked(platform_api_key, &marked).await?;
            failed = outcome.failed_count.clamp(0, marked.len() as i64);
        }

        Ok(PageOutcome {
            synced: marked.len() as i64 - failed,
            skipped,
            failed,
        })
    }
}
