//! External marketing platform client: bulk contact and order upserts behind
//! the reconciliation engine.

mod client;
mod error;

pub use client::PlatformApiClient;
pub use error::{PlatformApiError, Result};
