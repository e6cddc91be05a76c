//! Database model for the durable job queue.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shopsync_core::jobs::{JobStatus, SyncJob};
use shopsync_core::sync::EntityType;
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
#[diesel(table_name = crate::schema::sync_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncJobDB {
    pub id: String,
    pub shop_domain: String,
    pub access_token: String,
    pub entity_type: String,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl TryFrom<SyncJobDB> for SyncJob {
    type Error = Error;

    fn try_from(row: SyncJobDB) -> Result<Self> {
        let entity_type = EntityType::parse(&row.entity_type).ok_or_else(|| {
            Error::Validation(format!("Unknown entity type '{}'", row.entity_type))
        })?;
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| Error::Validation(format!("Unknown job status '{}'", row.status)))?;
        Ok(SyncJob {
            id: row.id,
            shop_domain: row.shop_domain,
            access_token: row.access_token,
            entity_type,
            status,
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: timestamps::parse(&row.created_at),
            started_at: timestamps::parse_opt(row.started_at.as_deref()),
            finished_at: timestamps::parse_opt(row.finished_at.as_deref()),
        })
    }
}
