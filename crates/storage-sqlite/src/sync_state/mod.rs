//! SQLite persistence for sync records and run logs.

mod model;
mod repository;

pub use model::{SyncRecordDB, SyncRunLogDB};
pub use repository::SyncStateRepository;
