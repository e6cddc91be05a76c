//! Durable sync-job model and queue contract.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sync::EntityType;
use crate::Result;

/// Finished jobs are kept for inspection, bounded per terminal status.
pub const SUCCEEDED_JOB_RETENTION: i64 = 1000;
pub const FAILED_JOB_RETENTION: i64 = 5000;

/// Queue lifecycle of one job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(JobStatus::Queued),
            "running" => Some(JobStatus::Running),
            "succeeded" => Some(JobStatus::Succeeded),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// One queued sync run for a (shop, entity type).
///
/// The row carries the credentials the run needs, so a worker never blocks
/// on anything but the shop lookup. There is no job-level retry: a failed
/// run surfaces through the run log and is re-enqueued explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: String,
    pub shop_domain: String,
    pub access_token: String,
    pub entity_type: EntityType,
    pub status: JobStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Enqueue payload; ids and timestamps are assigned by the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncJob {
    pub shop_domain: String,
    pub access_token: String,
    pub entity_type: EntityType,
}

impl NewSyncJob {
    pub fn new(
        shop_domain: impl Into<String>,
        access_token: impl Into<String>,
        entity_type: EntityType,
    ) -> Self {
        NewSyncJob {
            shop_domain: shop_domain.into(),
            access_token: access_token.into(),
            entity_type,
        }
    }
}

/// Durable queue operations.
///
/// `claim_next` must hand a given job to exactly one caller even under
/// concurrent workers; implementations serialize the claim internally.
#[async_trait]
pub trait JobQueueRepositoryTrait: Send + Sync {
    async fn enqueue(&self, job: NewSyncJob) -> Result<SyncJob>;

    /// Oldest queued job, atomically moved to `running`.
    async fn claim_next(&self) -> Result<Option<SyncJob>>;

    async fn mark_succeeded(&self, job_id: &str) -> Result<()>;

    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()>;

    /// Drops finished jobs beyond the retention bounds; returns rows removed.
    async fn prune_finished(&self) -> Result<usize>;
}
