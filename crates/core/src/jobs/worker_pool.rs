//! Concurrent worker pool draining the durable job queue.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::job_model::{JobQueueRepositoryTrait, SyncJob};
use crate::shops::ShopRepositoryTrait;
use crate::sync::{ReconciliationEngine, ShopCredentials, SyncRunLog, SyncStatus};
use crate::{Error, Result};

/// Workers pulling jobs concurrently, by default.
pub const WORKER_CONCURRENCY_DEFAULT: usize = 10;

/// Idle workers poll the queue on this cadence, plus jitter so a pool does
/// not stampede the database in lockstep.
pub const WORKER_IDLE_POLL_SECS: u64 = 5;
pub const WORKER_IDLE_POLL_JITTER_MS: u64 = 750;

/// Pause after a claim error before polling again.
const CLAIM_ERROR_BACKOFF_SECS: u64 = 15;

/// Pool of workers, each looping claim → run → ack until shutdown.
///
/// A job failure is logged and recorded on the job row; it never escapes the
/// worker loop, so one shop's bad run cannot stall the others.
pub struct SyncWorkerPool {
    jobs: Arc<dyn JobQueueRepositoryTrait>,
    shops: Arc<dyn ShopRepositoryTrait>,
    engine: Arc<ReconciliationEngine>,
    concurrency: usize,
}

impl SyncWorkerPool {
    pub fn new(
        jobs: Arc<dyn JobQueueRepositoryTrait>,
        shops: Arc<dyn ShopRepositoryTrait>,
        engine: Arc<ReconciliationEngine>,
        concurrency: usize,
    ) -> Self {
        SyncWorkerPool {
            jobs,
            shops,
            engine,
            concurrency: concurrency.max(1),
        }
    }

    /// Spawns the workers. They stop between jobs once `shutdown` turns true.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.concurrency)
            .map(|worker_id| {
                let pool = Arc::clone(&self);
                let shutdown = shutdown.clone();
                tokio::spawn(async move { pool.worker_loop(worker_id, shutdown).await })
            })
            .collect()
    }

    async fn worker_loop(&self, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        info!("[SyncWorker {}] started", worker_id);
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.jobs.claim_next().await {
                Ok(Some(job)) => {
                    debug!(
                        "[SyncWorker {}] claimed job {} ({} {})",
                        worker_id,
                        job.id,
                        job.shop_domain,
                        job.entity_type.as_str()
                    );
                    self.run_job(worker_id, &job).await;
                    if let Err(err) = self.jobs.prune_finished().await {
                        warn!("[SyncWorker {}] prune failed: {}", worker_id, err);
                    }
                }
                Ok(None) => {
                    let idle = Duration::from_secs(WORKER_IDLE_POLL_SECS)
                        + Duration::from_millis(
                            rand::thread_rng().gen_range(0..WORKER_IDLE_POLL_JITTER_MS),
                        );
                    // A dropped sender means the process is tearing down.
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(idle) => {}
                    }
                }
                Err(err) => {
                    error!("[SyncWorker {}] claim failed: {}", worker_id, err);
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(Duration::from_secs(CLAIM_ERROR_BACKOFF_SECS)) => {}
                    }
                }
            }
        }
        info!("[SyncWorker {}] stopped", worker_id);
    }

    /// Runs one job and records its terminal status. Every failure path ends
    /// here; nothing propagates out of the worker loop.
    async fn run_job(&self, worker_id: usize, job: &SyncJob) {
        match self.process(job).await {
            Ok(log) if log.status == SyncStatus::Complete => {
                info!(
                    "[SyncWorker {}] job {} complete: synced={} skipped={} failed={}",
                    worker_id, job.id, log.synced_count, log.skipped_count, log.failed_count
                );
                if let Err(err) = self.jobs.mark_succeeded(&job.id).await {
                    error!("[SyncWorker {}] ack failed for {}: {}", worker_id, job.id, err);
                }
            }
            Ok(log) => {
                warn!(
                    "[SyncWorker {}] job {} finished with run status {}",
                    worker_id,
                    job.id,
                    log.status.as_str()
                );
                let reason = format!("run finished with status {}", log.status.as_str());
                if let Err(err) = self.jobs.mark_failed(&job.id, &reason).await {
                    error!("[SyncWorker {}] ack failed for {}: {}", worker_id, job.id, err);
                }
            }
            Err(err) => {
                error!("[SyncWorker {}] job {} failed: {}", worker_id, job.id, err);
                if let Err(ack_err) = self.jobs.mark_failed(&job.id, &err.to_string()).await {
                    error!(
                        "[SyncWorker {}] ack failed for {}: {}",
                        worker_id, job.id, ack_err
                    );
                }
            }
        }
    }

    async fn process(&self, job: &SyncJob) -> Result<SyncRunLog> {
        let shop = self
            .shops
            .get_by_domain(&job.shop_domain)
            .await?
            .ok_or_else(|| Error::Validation(format!("unknown shop {}", job.shop_domain)))?;

        // Defensive re-check at claim time: enqueue validated the credential,
        // but the merchant may have disconnected the platform since. The job
        // is dropped without touching the run log.
        let platform_api_key = shop
            .platform_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::MissingCredential(shop.shop_domain.clone()))?;

        let credentials = ShopCredentials {
            shop_domain: job.shop_domain.clone(),
            access_token: job.access_token.clone(),
        };
        self.engine
            .run(&shop.id, &credentials, &platform_api_key, job.entity_type)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobStatus, NewSyncJob};
    use crate::sync::{EntityType, SyncStateRepositoryTrait};
    use crate::test_support::{
        order, page, shop, ts, InMemoryJobQueue, InMemoryShops, InMemorySyncState,
        RecordingPlatform, ScriptedShopData,
    };

    fn pool_with(
        shop_data: ScriptedShopData,
        jobs: Arc<InMemoryJobQueue>,
        shops: Arc<InMemoryShops>,
        sync_state: Arc<InMemorySyncState>,
        concurrency: usize,
    ) -> Arc<SyncWorkerPool> {
        let engine = Arc::new(ReconciliationEngine::new(
            Arc::new(shop_data),
            Arc::new(RecordingPlatform::default()),
            sync_state,
        ));
        Arc::new(SyncWorkerPool::new(jobs, shops, engine, concurrency))
    }

    async fn wait_until_drained(jobs: &InMemoryJobQueue) {
        for _ in 0..200 {
            let drained = jobs.jobs.lock().unwrap().iter().all(|job| {
                job.status == JobStatus::Succeeded || job.status == JobStatus::Failed
            });
            if drained {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("queue never drained");
    }

    #[tokio::test]
    async fn worker_runs_job_and_marks_it_succeeded() {
        let jobs = Arc::new(InMemoryJobQueue::default());
        let shops = Arc::new(InMemoryShops::default());
        let sync_state = Arc::new(InMemorySyncState::default());
        shops.seed(shop("shop-1", "s.myshopify.com", Some("pk_test")));

        let shop_data = ScriptedShopData::with_order_pages(
            1,
            vec![page(vec![order("o1", ts(100))], None, false)],
        );
        let queued = jobs
            .enqueue(NewSyncJob::new("s.myshopify.com", "shpat_x", EntityType::Order))
            .await
            .expect("enqueue");

        let pool = pool_with(shop_data, jobs.clone(), shops, sync_state.clone(), 1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = pool.spawn(shutdown_rx);

        wait_until_drained(&jobs).await;
        shutdown_tx.send(true).expect("signal shutdown");
        for handle in handles {
            handle.await.expect("worker join");
        }

        let job = jobs.job(&queued.id).expect("job");
        assert_eq!(job.status, JobStatus::Succeeded);
        let log = sync_state
            .get_run_log("shop-1", EntityType::Order)
            .await
            .expect("get")
            .expect("log");
        assert_eq!(log.status, SyncStatus::Complete);
        assert_eq!(log.synced_count, 1);
    }

    #[tokio::test]
    async fn missing_credential_fails_job_without_touching_run_log() {
        let jobs = Arc::new(InMemoryJobQueue::default());
        let shops = Arc::new(InMemoryShops::default());
        let sync_state = Arc::new(InMemorySyncState::default());
        shops.seed(shop("shop-1", "s.myshopify.com", None));

        let queued = jobs
            .enqueue(NewSyncJob::new("s.myshopify.com", "shpat_x", EntityType::Order))
            .await
            .expect("enqueue");

        let pool = pool_with(
            ScriptedShopData::default(),
            jobs.clone(),
            shops,
            sync_state.clone(),
            1,
        );
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = pool.spawn(shutdown_rx);

        wait_until_drained(&jobs).await;
        shutdown_tx.send(true).expect("signal shutdown");
        for handle in handles {
            handle.await.expect("worker join");
        }

        let job = jobs.job(&queued.id).expect("job");
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job
            .last_error
            .as_deref()
            .expect("error recorded")
            .contains("Missing platform credential"));
        assert!(sync_state
            .get_run_log("shop-1", EntityType::Order)
            .await
            .expect("get")
            .is_none());
    }

    #[tokio::test]
    async fn one_failing_job_does_not_block_the_next() {
        let jobs = Arc::new(InMemoryJobQueue::default());
        let shops = Arc::new(InMemoryShops::default());
        let sync_state = Arc::new(InMemorySyncState::default());
        // First job's shop is unknown; the second one is healthy.
        shops.seed(shop("shop-2", "ok.myshopify.com", Some("pk_test")));

        let failing = jobs
            .enqueue(NewSyncJob::new("gone.myshopify.com", "shpat_x", EntityType::Order))
            .await
            .expect("enqueue failing");
        let healthy = jobs
            .enqueue(NewSyncJob::new("ok.myshopify.com", "shpat_x", EntityType::Order))
            .await
            .expect("enqueue healthy");

        let shop_data = ScriptedShopData::with_order_pages(
            1,
            vec![page(vec![order("o1", ts(100))], None, false)],
        );
        let pool = pool_with(shop_data, jobs.clone(), shops, sync_state, 1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = pool.spawn(shutdown_rx);

        wait_until_drained(&jobs).await;
        shutdown_tx.send(true).expect("signal shutdown");
        for handle in handles {
            handle.await.expect("worker join");
        }

        assert_eq!(jobs.job(&failing.id).expect("job").status, JobStatus::Failed);
        assert_eq!(jobs.job(&healthy.id).expect("job").status, JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn run_level_error_marks_the_job_failed() {
        let jobs = Arc::new(InMemoryJobQueue::default());
        let shops = Arc::new(InMemoryShops::default());
        let sync_state = Arc::new(InMemorySyncState::default());
        shops.seed(shop("shop-1", "s.myshopify.com", Some("pk_test")));

        // The only page fetch fails, so the run log flips to ERROR.
        let shop_data = ScriptedShopData {
            order_total: 1,
            fail_order_page: Some(0),
            ..Default::default()
        };
        let queued = jobs
            .enqueue(NewSyncJob::new("s.myshopify.com", "shpat_x", EntityType::Order))
            .await
            .expect("enqueue");

        let pool = pool_with(shop_data, jobs.clone(), shops, sync_state.clone(), 1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handles = pool.spawn(shutdown_rx);

        wait_until_drained(&jobs).await;
        shutdown_tx.send(true).expect("signal shutdown");
        for handle in handles {
            handle.await.expect("worker join");
        }

        let job = jobs.job(&queued.id).expect("job");
        assert_eq!(job.status, JobStatus::Failed);
        let log = sync_state
            .get_run_log("shop-1", EntityType::Order)
            .await
            .expect("get")
            .expect("log");
        assert_eq!(log.status, SyncStatus::Error);
    }
}
