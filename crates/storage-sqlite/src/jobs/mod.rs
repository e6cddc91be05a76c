//! SQLite-backed durable job queue.

mod model;
mod repository;

pub use model::SyncJobDB;
pub use repository::JobQueueRepository;
