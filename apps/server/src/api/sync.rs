//! Sync-log read API and the operator re-run trigger.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use shopsync_core::jobs::SyncJob;
use shopsync_core::shops::Shop;
use shopsync_core::sync::{EntityType, SyncRunLog};

use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogsQuery {
    pub shop_domain: String,
}

/// Each log is `null` until the first run for that entity type is enqueued.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLogsResponse {
    pub customers_sync_log: Option<SyncRunLog>,
    pub order_sync_log: Option<SyncRunLog>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSyncRequest {
    pub shop_domain: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSyncResponse {
    pub queued: Vec<QueuedJobResponse>,
}

/// Queue acknowledgement without the job's credential payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedJobResponse {
    pub id: String,
    pub entity_type: EntityType,
}

impl From<SyncJob> for QueuedJobResponse {
    fn from(job: SyncJob) -> Self {
        QueuedJobResponse {
            id: job.id,
            entity_type: job.entity_type,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/sync-logs?shopDomain=...
async fn get_sync_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SyncLogsQuery>,
) -> ApiResult<Json<SyncLogsResponse>> {
    let shop = resolve_shop(&state, &query.shop_domain).await?;

    let customers_sync_log = state
        .sync_state
        .get_run_log(&shop.id, EntityType::Customer)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let order_sync_log = state
        .sync_state
        .get_run_log(&shop.id, EntityType::Order)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(SyncLogsResponse {
        customers_sync_log,
        order_sync_log,
    }))
}

/// POST /api/sync-runs
///
/// Re-invokes the enqueue path for the shop. Types already running stay
/// untouched; the response lists only what was actually queued.
async fn trigger_sync_runs(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TriggerSyncRequest>,
) -> ApiResult<Json<TriggerSyncResponse>> {
    let shop = resolve_shop(&state, &body.shop_domain).await?;

    let jobs = state
        .dispatch
        .enqueue_data_sync_tasks(&shop)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(
        "[Sync] Re-run for {} queued {} job(s)",
        shop.shop_domain,
        jobs.len()
    );

    Ok(Json(TriggerSyncResponse {
        queued: jobs.into_iter().map(QueuedJobResponse::from).collect(),
    }))
}

async fn resolve_shop(state: &AppState, shop_domain: &str) -> ApiResult<Shop> {
    let domain = shop_domain.trim();
    if domain.is_empty() {
        return Err(ApiError::BadRequest(
            "shopDomain must not be empty".to_string(),
        ));
    }
    state
        .shops
        .get_by_domain(domain)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("no shop installed for {}", domain)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sync-logs", get(get_sync_logs))
        .route("/api/sync-runs", post(trigger_sync_runs))
}
