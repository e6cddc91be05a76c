//! Shop install endpoint: upserts credentials and enqueues the first runs.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use shopsync_core::shops::NewShop;

use super::sync::QueuedJobResponse;
use crate::error::{ApiError, ApiResult};
use crate::main_lib::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Request/Response Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallShopRequest {
    pub shop_domain: String,
    pub access_token: String,
    pub platform_api_key: Option<String>,
}

/// Credentials never echo back; only identifiers and the queue outcome do.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallShopResponse {
    pub shop_id: String,
    pub shop_domain: String,
    pub queued: Vec<QueuedJobResponse>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/shops/install
async fn install_shop(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InstallShopRequest>,
) -> ApiResult<Json<InstallShopResponse>> {
    let shop_domain = body.shop_domain.trim().to_string();
    let access_token = body.access_token.trim().to_string();
    if shop_domain.is_empty() {
        return Err(ApiError::BadRequest(
            "shopDomain must not be empty".to_string(),
        ));
    }
    if access_token.is_empty() {
        return Err(ApiError::BadRequest(
            "accessToken must not be empty".to_string(),
        ));
    }
    let platform_api_key = body
        .platform_api_key
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty());

    let shop = state
        .shops
        .upsert(NewShop::new(shop_domain, access_token, platform_api_key))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("[Shops] Installed {}", shop.shop_domain);

    let jobs = state
        .dispatch
        .enqueue_data_sync_tasks(&shop)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(InstallShopResponse {
        shop_id: shop.id,
        shop_domain: shop.shop_domain,
        queued: jobs.into_iter().map(QueuedJobResponse::from).collect(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/shops/install", post(install_shop))
}
