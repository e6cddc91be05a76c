use shopsync_core::jobs::{
    JobQueueRepositoryTrait, JobStatus, NewSyncJob, SyncJob, FAILED_JOB_RETENTION,
    SUCCEEDED_JOB_RETENTION,
};
use shopsync_core::Result;

use super::model::SyncJobDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_jobs;
use crate::timestamps;
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;
use uuid::Uuid;

pub struct JobQueueRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl JobQueueRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        JobQueueRepository { pool, writer }
    }

    pub fn get_job_impl(&self, job_id: &str) -> Result<Option<SyncJob>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_jobs::table
            .find(job_id)
            .first::<SyncJobDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SyncJob::try_from).transpose()
    }
}

#[async_trait]
impl JobQueueRepositoryTrait for JobQueueRepository {
    async fn enqueue(&self, job: NewSyncJob) -> Result<SyncJob> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SyncJob> {
                let row = SyncJobDB {
                    id: Uuid::now_v7().to_string(),
                    shop_domain: job.shop_domain,
                    access_token: job.access_token,
                    entity_type: job.entity_type.as_str().to_string(),
                    status: JobStatus::Queued.as_str().to_string(),
                    attempts: 0,
                    last_error: None,
                    created_at: timestamps::format(&Utc::now()),
                    started_at: None,
                    finished_at: None,
                };
                diesel::insert_into(sync_jobs::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                SyncJob::try_from(row)
            })
            .await
    }

    async fn claim_next(&self) -> Result<Option<SyncJob>> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Option<SyncJob>> {
                let next = sync_jobs::table
                    .filter(sync_jobs::status.eq(JobStatus::Queued.as_str()))
                    .order((sync_jobs::created_at.asc(), sync_jobs::id.asc()))
                    .first::<SyncJobDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let row = match next {
                    Some(row) => row,
                    None => return Ok(None),
                };

                let claimed = diesel::update(sync_jobs::table.find(&row.id))
                    .set((
                        sync_jobs::status.eq(JobStatus::Running.as_str()),
                        sync_jobs::attempts.eq(row.attempts + 1),
                        sync_jobs::started_at.eq(Some(timestamps::format(&Utc::now()))),
                    ))
                    .returning(SyncJobDB::as_returning())
                    .get_result(conn)
                    .map_err(StorageError::from)?;

                SyncJob::try_from(claimed).map(Some)
            })
            .await
    }

    async fn mark_succeeded(&self, job_id: &str) -> Result<()> {
        let job_id = job_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(sync_jobs::table.find(job_id))
                    .set((
                        sync_jobs::status.eq(JobStatus::Succeeded.as_str()),
                        sync_jobs::finished_at.eq(Some(timestamps::format(&Utc::now()))),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()> {
        let job_id = job_id.to_string();
        let error = error.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::update(sync_jobs::table.find(job_id))
                    .set((
                        sync_jobs::status.eq(JobStatus::Failed.as_str()),
                        sync_jobs::last_error.eq(Some(error)),
                        sync_jobs::finished_at.eq(Some(timestamps::format(&Utc::now()))),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn prune_finished(&self) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let succeeded =
                    prune_status(conn, JobStatus::Succeeded, SUCCEEDED_JOB_RETENTION)?;
                let failed = prune_status(conn, JobStatus::Failed, FAILED_JOB_RETENTION)?;
                Ok(succeeded + failed)
            })
            .await
    }
}

/// Deletes rows of `terminal` status beyond the `keep` newest by finish time.
fn prune_status(conn: &mut SqliteConnection, terminal: JobStatus, keep: i64) -> Result<usize> {
    let stale_ids = sync_jobs::table
        .filter(sync_jobs::status.eq(terminal.as_str()))
        .order(sync_jobs::finished_at.desc())
        .offset(keep)
        .select(sync_jobs::id)
        .load::<String>(conn)
        .map_err(StorageError::from)?;

    if stale_ids.is_empty() {
        return Ok(0);
    }

    let removed = diesel::delete(sync_jobs::table.filter(sync_jobs::id.eq_any(&stale_ids)))
        .execute(conn)
        .map_err(StorageError::from)?;
    Ok(removed)
}
