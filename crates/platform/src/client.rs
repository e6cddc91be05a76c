//! Bulk upsert client for the external marketing platform.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use shopsync_core::sync::{BulkOutcome, ContactPayload, OrderPayload, PlatformClientTrait};
use shopsync_core::Result as CoreResult;

use crate::error::{PlatformApiError, Result};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Dedupe key the platform uses to make contact upserts idempotent.
const CONTACT_DEDUPE_KEY: &str = "externalCustomerId";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ContactsUpsertRequest<'a> {
    contacts: &'a [ContactPayload],
    dedupe_on: &'a str,
}

#[derive(Debug, Serialize)]
struct OrdersUpsertRequest<'a> {
    orders: &'a [OrderPayload],
}

/// The platform reports per-record rejections in a `failed*` field whose
/// shape varies: an array of records, a single object, or nothing at all.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactsUpsertResponse {
    failed_contacts: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrdersUpsertResponse {
    failed_orders: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    message: String,
}

/// An array counts its entries, any other non-null value counts as one.
fn failure_count(field: Option<&serde_json::Value>) -> i64 {
    match field {
        None | Some(serde_json::Value::Null) => 0,
        Some(serde_json::Value::Array(entries)) => entries.len() as i64,
        Some(_) => 1,
    }
}

/// Client for the platform's bulk contact/order upsert API.
///
/// Every call authenticates as the configured user with the shop's API key
/// as the password half of the HTTP Basic pair.
#[derive(Debug, Clone)]
pub struct PlatformApiClient {
    client: reqwest::Client,
    base_url: String,
    basic_user: String,
}

impl PlatformApiClient {
    /// Create a new platform client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the platform API
    /// * `basic_user` - Basic auth user name shared by all shops
    pub fn new(base_url: &str, basic_user: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            basic_user: basic_user.to_string(),
        }
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("Platform API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("Platform API response error ({}): {}", status, preview);
    }

    /// Parse a JSON response body. An empty success body deserializes to the
    /// default response shape.
    async fn parse_response<T: serde::de::DeserializeOwned + Default>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|err| err.message)
                .unwrap_or_else(|_| format!("Request failed: {}", body));
            if matches!(status.as_u16(), 401 | 403) {
                return Err(PlatformApiError::auth(message));
            }
            return Err(PlatformApiError::api(status.as_u16(), message));
        }

        if body.trim().is_empty() {
            return Ok(T::default());
        }
        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            PlatformApiError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    async fn post_bulk<B, T>(&self, path: &str, api_key: &str, request: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned + Default,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.basic_user, Some(api_key))
            .json(request)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}

#[async_trait]
impl PlatformClientTrait for PlatformApiClient {
    /// POST /contacts
    async fn upsert_contacts(
        &self,
        api_key: &str,
        contacts: &[ContactPayload],
    ) -> CoreResult<BulkOutcome> {
        if contacts.is_empty() {
            return Ok(BulkOutcome::default());
        }

        debug!("Pushing {} contacts to the platform", contacts.len());
        let request = ContactsUpsertRequest {
            contacts,
            dedupe_on: CONTACT_DEDUPE_KEY,
        };
        let response: ContactsUpsertResponse =
            self.post_bulk("/contacts", api_key, &request).await?;
        Ok(BulkOutcome {
            failed_count: failure_count(response.failed_contacts.as_ref()),
        })
    }

    /// POST /orders
    async fn upsert_orders(&self, api_key: &str, orders: &[OrderPayload]) -> CoreResult<BulkOutcome> {
        if orders.is_empty() {
            return Ok(BulkOutcome::default());
        }

        debug!("Pushing {} orders to the platform", orders.len());
        let request = OrdersUpsertRequest { orders };
        let response: OrdersUpsertResponse = self.post_bulk("/orders", api_key, &request).await?;
        Ok(BulkOutcome {
            failed_count: failure_count(response.failed_orders.as_ref()),
        })
    }
}
