//! SQLite storage for the sync service: repositories, embedded migrations
//! and the single-writer actor.

pub mod db;
pub mod errors;
pub mod jobs;
pub mod schema;
pub mod shops;
pub mod sync_state;

pub(crate) mod timestamps;

pub use db::{create_pool, get_connection, init, run_migrations, spawn_writer, WriteHandle};
pub use jobs::JobQueueRepository;
pub use shops::ShopRepository;
pub use sync_state::SyncStateRepository;
