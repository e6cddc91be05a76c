//! Storage-level error type and its mapping into the core error.

use thiserror::Error;

use shopsync_core::errors::DatabaseError;

/// Errors raised inside this crate. Repositories convert these into
/// `shopsync_core::Error` before returning across the trait boundary.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Connection failed: {0}")]
    Connection(#[from] diesel::ConnectionError),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for shopsync_core::Error {
    fn from(err: StorageError) -> Self {
        let db_err = match err {
            StorageError::Query(e) => DatabaseError::QueryFailed(e.to_string()),
            StorageError::Pool(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::Connection(e) => DatabaseError::ConnectionFailed(e.to_string()),
            StorageError::Migration(msg) => DatabaseError::MigrationFailed(msg),
            StorageError::Io(e) => DatabaseError::Internal(e.to_string()),
        };
        shopsync_core::Error::Database(db_err)
    }
}
