//! Error types for the Shopify Admin API client.

use thiserror::Error;

/// Result type alias for Shopify client operations.
pub type Result<T> = std::result::Result<T, ShopifyClientError>;

/// Errors that can occur while querying the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyClientError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP response from the Admin API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Errors reported inside an otherwise well-formed GraphQL response
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Invalid request (page size out of range, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication error (malformed access token)
    #[error("Authentication error: {0}")]
    Auth(String),
}

impl ShopifyClientError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a GraphQL error from the response's joined error messages
    pub fn graphql(message: impl Into<String>) -> Self {
        Self::GraphQl(message.into())
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
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

impl From<ShopifyClientError> for shopsync_core::Error {
    fn from(err: ShopifyClientError) -> Self {
        shopsync_core::Error::SourceApi(err.to_string())
    }
}
