//! In-memory fakes shared by the engine, dispatch and worker tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::jobs::{JobQueueRepositoryTrait, JobStatus, NewSyncJob, SyncJob};
use crate::shops::{NewShop, Shop, ShopRepositoryTrait};
use crate::sync::{
    BulkOutcome, ContactPayload, EntityType, OrderPayload, PlatformClientTrait, RunLogPatch,
    ShopCredentials, ShopDataClientTrait, SourceCustomer, SourceOrder, SourcePage, SyncRecord,
    SyncRunLog, SyncStateRepositoryTrait, SyncStatus,
};
use crate::{Error, Result};

pub(crate) fn ts(secs_after_epoch: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(secs_after_epoch)
}

pub(crate) fn credentials(shop_domain: &str) -> ShopCredentials {
    ShopCredentials {
        shop_domain: shop_domain.to_string(),
        access_token: "shpat_test".to_string(),
    }
}

pub(crate) fn order(id: &str, updated_at: DateTime<Utc>) -> SourceOrder {
    SourceOrder {
        id: id.to_string(),
        name: Some(format!("#{}", id)),
        email: Some(format!("{}@example.com", id)),
        currency_code: Some("USD".to_string()),
        total_price: Some("10.00".to_string()),
        subtotal_price: Some("9.00".to_string()),
        total_tax: Some("1.00".to_string()),
        customer: None,
        shipping_address: None,
        line_items: vec![],
        created_at: ts(0),
        updated_at,
    }
}

pub(crate) fn customer(id: &str, updated_at: DateTime<Utc>) -> SourceCustomer {
    SourceCustomer {
        id: id.to_string(),
        email: Some(format!("{}@example.com", id)),
        first_name: Some("Test".to_string()),
        last_name: Some("Customer".to_string()),
        phone: None,
        default_address: None,
        created_at: ts(0),
        updated_at,
    }
}

pub(crate) fn page<T>(nodes: Vec<T>, end_cursor: Option<&str>, has_next_page: bool) -> SourcePage<T> {
    SourcePage {
        nodes,
        end_cursor: end_cursor.map(str::to_string),
        has_next_page,
    }
}

// ---------------------------------------------------------------------------
// Sync-state store
// ---------------------------------------------------------------------------

/// Trait-complete in-memory sync-state store. Every persisted run log is
/// also appended to `log_history` so tests can assert monotonicity.
#[derive(Default)]
pub(crate) struct InMemorySyncState {
    pub records: Mutex<HashMap<(String, String), SyncRecord>>,
    pub run_logs: Mutex<HashMap<(String, EntityType), SyncRunLog>>,
    pub log_history: Mutex<Vec<SyncRunLog>>,
}

impl InMemorySyncState {
    pub fn record(&self, shop_id: &str, entity_id: &str) -> Option<SyncRecord> {
        self.records
            .lock()
            .unwrap()
            .get(&(shop_id.to_string(), entity_id.to_string()))
            .cloned()
    }

    pub fn seed_record(&self, record: SyncRecord) {
        self.records.lock().unwrap().insert(
            (record.shop_id.clone(), record.entity_id.clone()),
            record,
        );
    }

    pub fn seed_run_log(&self, log: SyncRunLog) {
        self.run_logs
            .lock()
            .unwrap()
            .insert((log.shop_id.clone(), log.entity_type), log);
    }
}

#[async_trait]
impl SyncStateRepositoryTrait for InMemorySyncState {
    async fn get_sync_records_by_ids(
        &self,
        shop_id: &str,
        entity_ids: &[String],
    ) -> Result<Vec<SyncRecord>> {
        let records = self.records.lock().unwrap();
        Ok(entity_ids
            .iter()
            .filter_map(|entity_id| records.get(&(shop_id.to_string(), entity_id.clone())))
            .cloned()
            .collect())
    }

    async fn upsert_sync_record(&self, record: &SyncRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        let key = (record.shop_id.clone(), record.entity_id.clone());
        match records.get_mut(&key) {
            Some(existing) => existing.updated_at = record.updated_at,
            None => {
                records.insert(key, record.clone());
            }
        }
        Ok(())
    }

    async fn get_run_log(
        &self,
        shop_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<SyncRunLog>> {
        Ok(self
            .run_logs
            .lock()
            .unwrap()
            .get(&(shop_id.to_string(), entity_type))
            .cloned())
    }

    async fn upsert_run_log(
        &self,
        shop_id: &str,
        entity_type: EntityType,
        patch: RunLogPatch,
    ) -> Result<SyncRunLog> {
        let mut logs = self.run_logs.lock().unwrap();
        let log = logs
            .entry((shop_id.to_string(), entity_type))
            .or_insert_with(|| SyncRunLog {
                shop_id: shop_id.to_string(),
                entity_type,
                status: SyncStatus::NotStarted,
                total_count: 0,
                synced_count: 0,
                skipped_count: 0,
                failed_count: 0,
                started_at: None,
                updated_at: Utc::now(),
            });
        if let Some(status) = patch.status {
            log.status = status;
        }
        if let Some(total) = patch.total_count {
            log.total_count = total;
        }
        if let Some(synced) = patch.synced_count {
            log.synced_count = synced;
        }
        if let Some(skipped) = patch.skipped_count {
            log.skipped_count = skipped;
        }
        if let Some(failed) = patch.failed_count {
            log.failed_count = failed;
        }
        if let Some(started_at) = patch.started_at {
            log.started_at = Some(started_at);
        }
        log.updated_at = Utc::now();
        let merged = log.clone();
        self.log_history.lock().unwrap().push(merged.clone());
        Ok(merged)
    }
}

// ---------------------------------------------------------------------------
// Shop data client
// ---------------------------------------------------------------------------

/// Scripted source: pages are addressed by cursor, where a page's
/// `end_cursor` is the stringified index of the next page. Reusable across
/// runs, so re-sync tests can share one instance.
#[derive(Default)]
pub(crate) struct ScriptedShopData {
    pub customer_total: i64,
    pub order_total: i64,
    pub customer_pages: Vec<SourcePage<SourceCustomer>>,
    pub order_pages: Vec<SourcePage<SourceOrder>>,
    /// Page index whose fetch fails, for chunk-failure tests.
    pub fail_order_page: Option<usize>,
    pub fail_counts: bool,
    pub page_calls: Mutex<usize>,
}

impl ScriptedShopData {
    pub fn with_order_pages(total: i64, pages: Vec<SourcePage<SourceOrder>>) -> Self {
        ScriptedShopData {
            order_total: total,
            order_pages: pages,
            ..Default::default()
        }
    }

    pub fn with_customer_pages(total: i64, pages: Vec<SourcePage<SourceCustomer>>) -> Self {
        ScriptedShopData {
            customer_total: total,
            customer_pages: pages,
            ..Default::default()
        }
    }

    fn page_index(cursor: Option<&str>) -> usize {
        cursor.and_then(|c| c.parse().ok()).unwrap_or(0)
    }
}

#[async_trait]
impl ShopDataClientTrait for ScriptedShopData {
    async fn customer_count(&self, _credentials: &ShopCredentials) -> Result<i64> {
        if self.fail_counts {
            return Err(Error::SourceApi("count query failed".to_string()));
        }
        Ok(self.customer_total)
    }

    async fn order_count(&self, _credentials: &ShopCredentials) -> Result<i64> {
        if self.fail_counts {
            return Err(Error::SourceApi("count query failed".to_string()));
        }
        Ok(self.order_total)
    }

    async fn customers_page(
        &self,
        _credentials: &ShopCredentials,
        _page_size: i64,
        cursor: Option<&str>,
    ) -> Result<SourcePage<SourceCustomer>> {
        *self.page_calls.lock().unwrap() += 1;
        let index = Self::page_index(cursor);
        self.customer_pages
            .get(index)
            .cloned()
            .ok_or_else(|| Error::SourceApi(format!("no scripted customer page {}", index)))
    }

    async fn orders_page(
        &self,
        _credentials: &ShopCredentials,
        _page_size: i64,
        cursor: Option<&str>,
    ) -> Result<SourcePage<SourceOrder>> {
        *self.page_calls.lock().unwrap() += 1;
        let index = Self::page_index(cursor);
        if self.fail_order_page == Some(index) {
            return Err(Error::SourceApi(format!("page {} fetch failed", index)));
        }
        self.order_pages
            .get(index)
            .cloned()
            .ok_or_else(|| Error::SourceApi(format!("no scripted order page {}", index)))
    }
}

// ---------------------------------------------------------------------------
// Platform client
// ---------------------------------------------------------------------------

/// Records every bulk batch and reports scripted per-call failure counts.
#[derive(Default)]
pub(crate) struct RecordingPlatform {
    pub contact_batches: Mutex<Vec<Vec<ContactPayload>>>,
    pub order_batches: Mutex<Vec<Vec<OrderPayload>>>,
    /// Failure count to report per call, in call order; 0 once exhausted.
    pub scripted_failures: Mutex<Vec<i64>>,
    /// Bulk call index that errors outright, for whole-call failure tests.
    pub error_on_call: Option<usize>,
    calls: Mutex<usize>,
}

impl RecordingPlatform {
    pub fn with_failures(failures: Vec<i64>) -> Self {
        RecordingPlatform {
            scripted_failures: Mutex::new(failures),
            ..Default::default()
        }
    }

    pub fn erroring_on(call_index: usize) -> Self {
        RecordingPlatform {
            error_on_call: Some(call_index),
            ..Default::default()
        }
    }

    fn next_outcome(&self) -> Result<BulkOutcome> {
        let mut calls = self.calls.lock().unwrap();
        let call_index = *calls;
        *calls += 1;
        if self.error_on_call == Some(call_index) {
            return Err(Error::PlatformApi("bulk upsert failed".to_string()));
        }
        let mut scripted = self.scripted_failures.lock().unwrap();
        let failed_count = if scripted.is_empty() {
            0
        } else {
            scripted.remove(0)
        };
        Ok(BulkOutcome { failed_count })
    }
}

#[async_trait]
impl PlatformClientTrait for RecordingPlatform {
    async fn upsert_contacts(
        &self,
        _api_key: &str,
        contacts: &[ContactPayload],
    ) -> Result<BulkOutcome> {
        let outcome = self.next_outcome();
        if outcome.is_ok() {
            self.contact_batches.lock().unwrap().push(contacts.to_vec());
        }
        outcome
    }

    async fn upsert_orders(&self, _api_key: &str, orders: &[OrderPayload]) -> Result<BulkOutcome> {
        let outcome = self.next_outcome();
        if outcome.is_ok() {
            self.order_batches.lock().unwrap().push(orders.to_vec());
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Shops
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct InMemoryShops {
    pub shops: Mutex<HashMap<String, Shop>>,
}

impl InMemoryShops {
    pub fn seed(&self, shop: Shop) {
        self.shops
            .lock()
            .unwrap()
            .insert(shop.shop_domain.clone(), shop);
    }
}

pub(crate) fn shop(id: &str, domain: &str, platform_api_key: Option<&str>) -> Shop {
    Shop {
        id: id.to_string(),
        shop_domain: domain.to_string(),
        access_token: "shpat_test".to_string(),
        platform_api_key: platform_api_key.map(str::to_string),
        customers_sync_enabled: true,
        orders_sync_enabled: true,
        installed_at: ts(0),
        updated_at: ts(0),
    }
}

#[async_trait]
impl ShopRepositoryTrait for InMemoryShops {
    async fn get_by_domain(&self, shop_domain: &str) -> Result<Option<Shop>> {
        Ok(self.shops.lock().unwrap().get(shop_domain).cloned())
    }

    async fn upsert(&self, new_shop: NewShop) -> Result<Shop> {
        let mut shops = self.shops.lock().unwrap();
        let now = Utc::now();
        let shop = shops
            .entry(new_shop.shop_domain.clone())
            .and_modify(|existing| {
                existing.access_token = new_shop.access_token.clone();
                existing.platform_api_key = new_shop.platform_api_key.clone();
                existing.customers_sync_enabled = new_shop.customers_sync_enabled;
                existing.orders_sync_enabled = new_shop.orders_sync_enabled;
                existing.updated_at = now;
            })
            .or_insert_with(|| Shop {
                id: Uuid::new_v4().to_string(),
                shop_domain: new_shop.shop_domain.clone(),
                access_token: new_shop.access_token.clone(),
                platform_api_key: new_shop.platform_api_key.clone(),
                customers_sync_enabled: new_shop.customers_sync_enabled,
                orders_sync_enabled: new_shop.orders_sync_enabled,
                installed_at: now,
                updated_at: now,
            });
        Ok(shop.clone())
    }

    async fn delete_by_domain(&self, shop_domain: &str) -> Result<usize> {
        Ok(self
            .shops
            .lock()
            .unwrap()
            .remove(shop_domain)
            .map(|_| 1)
            .unwrap_or(0))
    }
}

// ---------------------------------------------------------------------------
// Job queue
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct InMemoryJobQueue {
    pub jobs: Mutex<Vec<SyncJob>>,
}

impl InMemoryJobQueue {
    pub fn queued_for(&self, shop_domain: &str, entity_type: EntityType) -> usize {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|job| {
                job.shop_domain == shop_domain
                    && job.entity_type == entity_type
                    && job.status == JobStatus::Queued
            })
            .count()
    }

    pub fn job(&self, job_id: &str) -> Option<SyncJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
    }
}

#[async_trait]
impl JobQueueRepositoryTrait for InMemoryJobQueue {
    async fn enqueue(&self, new_job: NewSyncJob) -> Result<SyncJob> {
        let job = SyncJob {
            id: Uuid::now_v7().to_string(),
            shop_domain: new_job.shop_domain,
            access_token: new_job.access_token,
            entity_type: new_job.entity_type,
            status: JobStatus::Queued,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        };
        self.jobs.lock().unwrap().push(job.clone());
        Ok(job)
    }

    async fn claim_next(&self) -> Result<Option<SyncJob>> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|job| job.status == JobStatus::Queued) {
            job.status = JobStatus::Running;
            job.attempts += 1;
            job.started_at = Some(Utc::now());
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn mark_succeeded(&self, job_id: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) {
            job.status = JobStatus::Succeeded;
            job.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|job| job.id == job_id) {
            job.status = JobStatus::Failed;
            job.last_error = Some(error.to_string());
            job.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn prune_finished(&self) -> Result<usize> {
        Ok(0)
    }
}
