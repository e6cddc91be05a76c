//! Single-flight enqueue of sync runs.

use std::sync::Arc;

use chrono::{Duration, Utc};
use log::{debug, warn};

use super::job_model::{JobQueueRepositoryTrait, NewSyncJob, SyncJob};
use crate::shops::Shop;
use crate::sync::{EntityType, RunLogPatch, SyncRunLog, SyncStateRepositoryTrait, SyncStatus};
use crate::Result;

/// An IN_PROGRESS run whose log has not been touched for this long is
/// treated as abandoned by a crashed worker and may be re-enqueued.
pub const STALE_RUN_RECLAIM_HOURS: i64 = 6;

/// Decides which (shop, entity type) runs to enqueue.
///
/// The check-then-set against the run log is the single-flight guard: a
/// fresh IN_PROGRESS row is written before the job, so a second enqueue
/// while a run is live is a no-op for that type. The check and set are not
/// atomic against a concurrent enqueue; the rare duplicate run that race
/// admits is benign because the whole pipeline is idempotent.
pub struct SyncDispatchService {
    sync_state: Arc<dyn SyncStateRepositoryTrait>,
    jobs: Arc<dyn JobQueueRepositoryTrait>,
    stale_run_reclaim: Duration,
}

impl SyncDispatchService {
    pub fn new(
        sync_state: Arc<dyn SyncStateRepositoryTrait>,
        jobs: Arc<dyn JobQueueRepositoryTrait>,
    ) -> Self {
        Self::with_stale_reclaim(sync_state, jobs, Duration::hours(STALE_RUN_RECLAIM_HOURS))
    }

    pub fn with_stale_reclaim(
        sync_state: Arc<dyn SyncStateRepositoryTrait>,
        jobs: Arc<dyn JobQueueRepositoryTrait>,
        stale_run_reclaim: Duration,
    ) -> Self {
        SyncDispatchService {
            sync_state,
            jobs,
            stale_run_reclaim,
        }
    }

    /// Enqueues one job per enabled entity type that is not already running,
    /// and returns the jobs actually queued.
    ///
    /// A shop without a platform credential gets nothing queued: there is
    /// nowhere to sync to until the merchant connects the platform.
    pub async fn enqueue_data_sync_tasks(&self, shop: &Shop) -> Result<Vec<SyncJob>> {
        if shop
            .platform_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .is_none()
        {
            warn!(
                "[SyncDispatch] {} has no platform credential, nothing enqueued",
                shop.shop_domain
            );
            return Ok(Vec::new());
        }

        let mut queued = Vec::new();
        for entity_type in EntityType::all() {
            if !shop.sync_enabled(entity_type) {
                debug!(
                    "[SyncDispatch] {} {} sync disabled, skipping",
                    shop.shop_domain,
                    entity_type.as_str()
                );
                continue;
            }

            let run_log = self.sync_state.get_run_log(&shop.id, entity_type).await?;
            if let Some(log) = &run_log {
                if log.status == SyncStatus::InProgress {
                    if self.is_stale(log) {
                        warn!(
                            "[SyncDispatch] {} {} run stale since {}, reclaiming",
                            shop.shop_domain,
                            entity_type.as_str(),
                            log.updated_at
                        );
                    } else {
                        debug!(
                            "[SyncDispatch] {} {} run already in progress, skipping",
                            shop.shop_domain,
                            entity_type.as_str()
                        );
                        continue;
                    }
                }
            }

            // Single-flight set: flip the log to a zeroed IN_PROGRESS run
            // before the job exists.
            self.sync_state
                .upsert_run_log(&shop.id, entity_type, RunLogPatch::fresh_run(Utc::now()))
                .await?;
            let job = self
                .jobs
                .enqueue(NewSyncJob::new(
                    &shop.shop_domain,
                    &shop.access_token,
                    entity_type,
                ))
                .await?;
            debug!(
                "[SyncDispatch] queued {} {} sync as job {}",
                shop.shop_domain,
                entity_type.as_str(),
                job.id
            );
            queued.push(job);
        }
        Ok(queued)
    }

    fn is_stale(&self, log: &SyncRunLog) -> bool {
        Utc::now() - log.updated_at >= self.stale_run_reclaim
    }
}
