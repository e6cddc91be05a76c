//! Error types for the platform API client.

use thiserror::Error;

/// Result type alias for platform client operations.
pub type Result<T> = std::result::Result<T, PlatformApiError>;

/// Errors that can occur while pushing data to the platform.
#[derive(Debug, Error)]
pub enum PlatformApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP response from the platform
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication error (rejected Basic credentials)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl PlatformApiError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<PlatformApiError> for shopsync_core::Error {
    fn from(err: PlatformApiError) -> Self {
        shopsync_core::Error::PlatformApi(err.to_string())
    }
}
