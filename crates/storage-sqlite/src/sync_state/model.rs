//! Database models for sync records and run logs.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shopsync_core::sync::{EntityType, SyncRecord, SyncRunLog, SyncStatus};
use shopsync_core::{Error, Result};

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
#[diesel(primary_key(shop_id, entity_id))]
#[diesel(table_name = crate::schema::sync_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncRecordDB {
    pub shop_id: String,
    pub entity_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&SyncRecord> for SyncRecordDB {
    fn from(record: &SyncRecord) -> Self {
        SyncRecordDB {
            shop_id: record.shop_id.clone(),
            entity_id: record.entity_id.clone(),
            created_at: timestamps::format(&record.created_at),
            updated_at: timestamps::format(&record.updated_at),
        }
    }
}

impl From<SyncRecordDB> for SyncRecord {
    fn from(row: SyncRecordDB) -> Self {
        SyncRecord {
            entity_id: row.entity_id,
            created_at: timestamps::parse(&row.created_at),
            updated_at: timestamps::parse(&row.updated_at),
            shop_id: row.shop_id,
        }
    }
}

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
#[diesel(primary_key(shop_id, entity_type))]
#[diesel(table_name = crate::schema::sync_run_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncRunLogDB {
    pub shop_id: String,
    pub entity_type: String,
    pub status: String,
    pub total_count: i64,
    pub synced_count: i64,
    pub skipped_count: i64,
    pub failed_count: i64,
    pub started_at: Option<String>,
    pub updated_at: String,
}

impl From<&SyncRunLog> for SyncRunLogDB {
    fn from(log: &SyncRunLog) -> Self {
        SyncRunLogDB {
            shop_id: log.shop_id.clone(),
            entity_type: log.entity_type.as_str().to_string(),
            status: log.status.as_str().to_string(),
            total_count: log.total_count,
            synced_count: log.synced_count,
            skipped_count: log.skipped_count,
            failed_count: log.failed_count,
            started_at: log.started_at.as_ref().map(timestamps::format),
            updated_at: timestamps::format(&log.updated_at),
        }
    }
}

impl TryFrom<SyncRunLogDB> for SyncRunLog {
    type Error = Error;

    fn try_from(row: SyncRunLogDB) -> Result<Self> {
        let entity_type = EntityType::parse(&row.entity_type).ok_or_else(|| {
            Error::Validation(format!("Unknown entity type '{}'", row.entity_type))
        })?;
        let status = SyncStatus::parse(&row.status)
            .ok_or_else(|| Error::Validation(format!("Unknown sync status '{}'", row.status)))?;
        Ok(SyncRunLog {
            shop_id: row.shop_id,
            entity_type,
            status,
            total_count: row.total_count,
            synced_count: row.synced_count,
            skipped_count: row.skipped_count,
            failed_count: row.failed_count,
            started_at: timestamps::parse_opt(row.started_at.as_deref()),
            updated_at: timestamps::parse(&row.updated_at),
        })
    }
}
