//! Crate-wide error type shared by services, repositories and clients.

use thiserror::Error;

/// Top-level error for the sync domain.
///
/// Storage and client crates define their own error enums and convert into
/// these variants at the trait boundary, so core stays free of diesel and
/// reqwest types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Source API error: {0}")]
    SourceApi(String),

    #[error("Platform API error: {0}")]
    PlatformApi(String),

    #[error("Missing platform credential for shop '{0}'")]
    MissingCredential(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Database failures, classified by where in the storage stack they arose.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("{0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
