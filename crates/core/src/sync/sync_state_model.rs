//! Sync-state domain models: per-entity sync records and per-run logs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Result;

/// The two reconciled entity domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Customer,
    Order,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Customer => "customer",
            EntityType::Order => "order",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "customer" => Some(EntityType::Customer),
            "order" => Some(EntityType::Order),
            _ => None,
        }
    }

    pub fn all() -> [EntityType; 2] {
        [EntityType::Customer, EntityType::Order]
    }
}

/// Run lifecycle status surfaced to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    NotStarted,
    InProgress,
    Complete,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::NotStarted => "NOT_STARTED",
            SyncStatus::InProgress => "IN_PROGRESS",
            SyncStatus::Complete => "COMPLETE",
            SyncStatus::Error => "ERROR",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NOT_STARTED" => Some(SyncStatus::NotStarted),
            "IN_PROGRESS" => Some(SyncStatus::InProgress),
            "COMPLETE" => Some(SyncStatus::Complete),
            "ERROR" => Some(SyncStatus::Error),
            _ => None,
        }
    }
}

/// Persisted marker of the last successfully-considered state of one entity.
///
/// At most one record exists per (shop, entity_id). The record is created on
/// first marking and updated in place afterwards; `updated_at` mirrors the
/// source entity's timestamp, not the wall clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    pub entity_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shop_id: String,
}

/// Aggregate progress/status record for one reconciliation run.
///
/// Exactly one row per (shop, entity_type). Counts only grow within a run;
/// `updated_at` advances on every persist, which doubles as the liveness
/// signal for stale-run reclaim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunLog {
    pub shop_id: String,
    pub entity_type: EntityType,
    pub status: SyncStatus,
    pub total_count: i64,
    pub synced_count: i64,
    pub skipped_count: i64,
    pub failed_count: i64,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Partial run-log update; `None` fields keep their stored value.
/// The first patch for a (shop, entity_type) creates the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunLogPatch {
    pub status: Option<SyncStatus>,
    pub total_count: Option<i64>,
    pub synced_count: Option<i64>,
    pub skipped_count: Option<i64>,
    pub failed_count: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,
}

impl RunLogPatch {
    /// Patch that resets the log to a zero-count IN_PROGRESS run.
    pub fn fresh_run(now: DateTime<Utc>) -> Self {
        RunLogPatch {
            status: Some(SyncStatus::InProgress),
            total_count: Some(0),
            synced_count: Some(0),
            skipped_count: Some(0),
            failed_count: Some(0),
            started_at: Some(now),
        }
    }

    pub fn status(status: SyncStatus) -> Self {
        RunLogPatch {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Persistence contract for sync records and run logs.
///
/// No multi-row transactional guarantee is required across the two tables:
/// both updates are idempotent and monotonic, so they may drift briefly.
#[async_trait]
pub trait SyncStateRepositoryTrait: Send + Sync {
    /// Batch lookup for one page worth of entity ids.
    async fn get_sync_records_by_ids(
        &self,
        shop_id: &str,
        entity_ids: &[String],
    ) -> Result<Vec<SyncRecord>>;

    /// Insert or update keyed by (shop_id, entity_id). An update keeps the
    /// stored `created_at`.
    async fn upsert_sync_record(&self, record: &SyncRecord) -> Result<()>;

    async fn get_run_log(
        &self,
        shop_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<SyncRunLog>>;

    /// Merge `patch` into the row for (shop_id, entity_type), creating it if
    /// missing, and return the merged log.
    async fn upsert_run_log(
        &self,
        shop_id: &str,
        entity_type: EntityType,
        patch: RunLogPatch,
    ) -> Result<SyncRunLog>;
}
