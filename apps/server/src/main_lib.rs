//! Process wiring: configuration from the environment, storage setup, client
//! construction, the worker pool and the axum server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shopsync_core::jobs::{
    JobQueueRepositoryTrait, SyncDispatchService, SyncWorkerPool, STALE_RUN_RECLAIM_HOURS,
    WORKER_CONCURRENCY_DEFAULT,
};
use shopsync_core::shops::ShopRepositoryTrait;
use shopsync_core::sync::{
    PlatformClientTrait, ReconciliationEngine, ShopDataClientTrait, SyncStateRepositoryTrait,
};
use shopsync_platform::PlatformApiClient;
use shopsync_shopify::{ShopifyAdminClient, DEFAULT_API_VERSION};
use shopsync_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, JobQueueRepository, ShopRepository,
    SyncStateRepository,
};

use crate::api;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";
const DEFAULT_DATABASE_DIR: &str = "./data";

/// Shared handles injected into request handlers.
pub struct AppState {
    pub shops: Arc<dyn ShopRepositoryTrait>,
    pub sync_state: Arc<dyn SyncStateRepositoryTrait>,
    pub dispatch: Arc<SyncDispatchService>,
}

/// Environment-derived settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_dir: String,
    pub platform_api_url: String,
    pub platform_api_user: String,
    pub shopify_api_version: String,
    pub worker_concurrency: usize,
    pub stale_run_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Config {
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            database_dir: env_or("DATABASE_PATH", DEFAULT_DATABASE_DIR),
            platform_api_url: env_required("PLATFORM_API_URL")?,
            platform_api_user: env_required("PLATFORM_API_USER")?,
            shopify_api_version: env_or("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            worker_concurrency: env_parsed("SYNC_WORKER_CONCURRENCY", WORKER_CONCURRENCY_DEFAULT)?,
            stale_run_hours: env_parsed("SYNC_STALE_RUN_HOURS", STALE_RUN_RECLAIM_HOURS)?,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_required(name: &str) -> anyhow::Result<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("{} must be set", name))
}

fn env_parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", name, raw)),
        None => Ok(default),
    }
}

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    let db_path = init(&config.database_dir)?;
    run_migrations(&db_path)?;
    let db_pool = create_pool(&db_path)?;
    let writer = spawn_writer(db_pool.as_ref().clone());
    info!("[Server] Database ready at {}", db_path);

    let shops: Arc<dyn ShopRepositoryTrait> =
        Arc::new(ShopRepository::new(db_pool.clone(), writer.clone()));
    let sync_state: Arc<dyn SyncStateRepositoryTrait> =
        Arc::new(SyncStateRepository::new(db_pool.clone(), writer.clone()));
    let jobs: Arc<dyn JobQueueRepositoryTrait> =
        Arc::new(JobQueueRepository::new(db_pool.clone(), writer.clone()));

    let shop_data: Arc<dyn ShopDataClientTrait> =
        Arc::new(ShopifyAdminClient::new(&config.shopify_api_version));
    let platform: Arc<dyn PlatformClientTrait> = Arc::new(PlatformApiClient::new(
        &config.platform_api_url,
        &config.platform_api_user,
    ));

    let engine = Arc::new(ReconciliationEngine::new(
        shop_data,
        platform,
        sync_state.clone(),
    ));
    let dispatch = Arc::new(SyncDispatchService::with_stale_reclaim(
        sync_state.clone(),
        jobs.clone(),
        chrono::Duration::hours(config.stale_run_hours),
    ));

    let workers = Arc::new(SyncWorkerPool::new(
        jobs,
        shops.clone(),
        engine,
        config.worker_concurrency,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handles = workers.spawn(shutdown_rx);
    info!(
        "[Server] Worker pool started, concurrency {}",
        config.worker_concurrency
    );

    let state = Arc::new(AppState {
        shops,
        sync_state,
        dispatch,
    });
    let app = api::router().with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("[Server] Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // HTTP has drained; now stop the workers and wait out in-flight jobs.
    let _ = shutdown_tx.send(true);
    for handle in worker_handles {
        if let Err(err) = handle.await {
            error!("[Server] Worker task panicked: {}", err);
        }
    }
    info!("[Server] Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("[Server] Failed to listen for ctrl-c: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_when_the_variable_is_unset() {
        assert_eq!(env_or("SHOPSYNC_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn env_parsed_falls_back_when_the_variable_is_unset() {
        let value: usize = env_parsed("SHOPSYNC_TEST_UNSET_NUM", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn env_required_names_the_missing_variable() {
        let err = env_required("SHOPSYNC_TEST_UNSET_REQUIRED").unwrap_err();
        assert!(err.to_string().contains("SHOPSYNC_TEST_UNSET_REQUIRED"));
    }
}
