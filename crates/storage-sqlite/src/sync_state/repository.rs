use shopsync_core::sync::{
    EntityType, RunLogPatch, SyncRecord, SyncRunLog, SyncStateRepositoryTrait, SyncStatus,
};
use shopsync_core::Result;

use super::model::{SyncRecordDB, SyncRunLogDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{sync_records, sync_run_logs};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::SqliteConnection;

use std::sync::Arc;

pub struct SyncStateRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SyncStateRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        SyncStateRepository { pool, writer }
    }

    pub fn get_sync_records_by_ids_impl(
        &self,
        shop_id: &str,
        entity_ids: &[String],
    ) -> Result<Vec<SyncRecord>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = get_connection(&self.pool)?;
        let rows = sync_records::table
            .filter(sync_records::shop_id.eq(shop_id))
            .filter(sync_records::entity_id.eq_any(entity_ids))
            .load::<SyncRecordDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(SyncRecord::from).collect())
    }

    pub fn get_run_log_impl(
        &self,
        shop_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<SyncRunLog>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_run_logs::table
            .find((shop_id, entity_type.as_str()))
            .first::<SyncRunLogDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(SyncRunLog::try_from).transpose()
    }
}

#[async_trait]
impl SyncStateRepositoryTrait for SyncStateRepository {
    async fn get_sync_records_by_ids(
        &self,
        shop_id: &str,
        entity_ids: &[String],
    ) -> Result<Vec<SyncRecord>> {
        self.get_sync_records_by_ids_impl(shop_id, entity_ids)
    }

    async fn upsert_sync_record(&self, record: &SyncRecord) -> Result<()> {
        let row = SyncRecordDB::from(record);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                // Conflict path leaves created_at at its stored value.
                diesel::insert_into(sync_records::table)
                    .values(&row)
                    .on_conflict((sync_records::shop_id, sync_records::entity_id))
                    .do_update()
                    .set(sync_records::updated_at.eq(&row.updated_at))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn get_run_log(
        &self,
        shop_id: &str,
        entity_type: EntityType,
    ) -> Result<Option<SyncRunLog>> {
        self.get_run_log_impl(shop_id, entity_type)
    }

    async fn upsert_run_log(
        &self,
        shop_id: &str,
        entity_type: EntityType,
        patch: RunLogPatch,
    ) -> Result<SyncRunLog> {
        let shop = shop_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SyncRunLog> {
                let now = Utc::now();
                let existing = sync_run_logs::table
                    .find((&shop, entity_type.as_str()))
                    .first::<SyncRunLogDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;

                let mut log = match existing {
                    Some(row) => SyncRunLog::try_from(row)?,
                    None => SyncRunLog {
                        shop_id: shop.clone(),
                        entity_type,
                        status: SyncStatus::NotStarted,
                        total_count: 0,
                        synced_count: 0,
                        skipped_count: 0,
                        failed_count: 0,
                        started_at: None,
                        updated_at: now,
                    },
                };

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
                if let Some(started) = patch.started_at {
                    log.started_at = Some(started);
                }
                log.updated_at = now;

                let row = SyncRunLogDB::from(&log);
                diesel::insert_into(sync_run_logs::table)
                    .values(&row)
                    .on_conflict((sync_run_logs::shop_id, sync_run_logs::entity_type))
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(log)
            })
            .await
    }
}
