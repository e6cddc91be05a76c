//! Shopify Admin GraphQL client: advisory entity counts and cursor-paged
//! reads of customers and orders.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use shopsync_core::sync::{
    ShopCredentials, ShopDataClientTrait, SourceCustomer, SourceOrder, SourcePage,
};
use shopsync_core::Result as CoreResult;

use crate::error::{Result, ShopifyClientError};
use crate::types::*;

/// Admin API version the queries are pinned to.
pub const DEFAULT_API_VERSION: &str = "2025-01";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Largest page the Admin API will serve.
const MAX_PAGE_SIZE: i64 = 250;

const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const CUSTOMERS_COUNT_QUERY: &str = "query { customersCount { count } }";
const ORDERS_COUNT_QUERY: &str = "query { ordersCount { count } }";

const CUSTOMERS_PAGE_QUERY: &str = r#"
query CustomersPage($first: Int!, $after: String) {
  customers(first: $first, after: $after) {
    nodes {
      id
      email
      firstName
      lastName
      phone
      defaultAddress {
        firstName
        lastName
        address1
        address2
        city
        province
        zip
        country
      }
      createdAt
      updatedAt
    }
    pageInfo {
      endCursor
      hasNextPage
    }
  }
}"#;

/// Line items beyond the first 50 of an order are not fetched.
const ORDERS_PAGE_QUERY: &str = r#"
query OrdersPage($first: Int!, $after: String) {
  orders(first: $first, after: $after) {
    nodes {
      id
      name
      email
      currencyCode
      totalPriceSet { shopMoney { amount } }
      subtotalPriceSet { shopMoney { amount } }
      totalTaxSet { shopMoney { amount } }
      customer {
        id
        email
      }
      shippingAddress {
        firstName
        lastName
        address1
        address2
        city
        province
        zip
        country
      }
      lineItems(first: 50) {
        nodes {
          title
          quantity
          originalUnitPriceSet { shopMoney { amount } }
        }
      }
      createdAt
      updatedAt
    }
    pageInfo {
      endCursor
      hasNextPage
    }
  }
}"#;

/// Client for the Shopify Admin GraphQL API.
///
/// One instance serves every shop; the endpoint is derived from the shop
/// domain on each call, so the client itself holds no per-shop state.
#[derive(Debug, Clone)]
pub struct ShopifyAdminClient {
    client: reqwest::Client,
    api_version: String,
    endpoint_override: Option<String>,
}

impl ShopifyAdminClient {
    /// Create a new Admin API client pinned to `api_version` (e.g. "2025-01").
    pub fn new(api_version: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_version: api_version.trim().to_string(),
            endpoint_override: None,
        }
    }

    /// Send every query to `endpoint` instead of the per-shop admin URL.
    /// Intended for tests and local API gateways.
    pub fn with_endpoint(api_version: &str, endpoint: &str) -> Self {
        let mut client = Self::new(api_version);
        client.endpoint_override = Some(endpoint.trim_end_matches('/').to_string());
        client
    }

    fn endpoint(&self, shop_domain: &str) -> String {
        match &self.endpoint_override {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}/admin/api/{}/graphql.json",
                shop_domain.trim().trim_end_matches('/'),
                self.api_version
            ),
        }
    }

    /// Create headers for an Admin API request.
    fn headers(&self, access_token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let token_value = HeaderValue::from_str(access_token)
            .map_err(|_| ShopifyClientError::auth("Invalid access token format"))?;
        headers.insert(ACCESS_TOKEN_HEADER, token_value);

        Ok(headers)
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("Admin API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("Admin API response error ({}): {}", status, preview);
    }

    /// Parse a GraphQL response body, unwrapping the envelope.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(ShopifyClientError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        let envelope: GraphQlResponse<T> = serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            ShopifyClientError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })?;

        if !envelope.errors.is_empty() {
            let messages = envelope
                .errors
                .iter()
                .map(|err| err.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ShopifyClientError::graphql(messages));
        }

        envelope
            .data
            .ok_or_else(|| ShopifyClientError::graphql("response carried no data"))
    }

    /// POST one GraphQL document for the given shop.
    async fn execute<T: DeserializeOwned>(
        &self,
        credentials: &ShopCredentials,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let url = self.endpoint(&credentials.shop_domain);
        let request = GraphQlRequest { query, variables };

        let response = self
            .client
            .post(&url)
            .headers(self.headers(&credentials.access_token)?)
            .json(&request)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    fn page_variables(page_size: i64, cursor: Option<&str>) -> Result<serde_json::Value> {
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ShopifyClientError::invalid_request(format!(
                "page size {} outside 1..={}",
                page_size, MAX_PAGE_SIZE
            )));
        }
        Ok(serde_json::json!({ "first": page_size, "after": cursor }))
    }
}

#[async_trait]
impl ShopDataClientTrait for ShopifyAdminClient {
    async fn customer_count(&self, credentials: &ShopCredentials) -> CoreResult<i64> {
        let data: CustomersCountData = self
            .execute(credentials, CUSTOMERS_COUNT_QUERY, serde_json::json!({}))
            .await?;
        Ok(data.customers_count.count)
    }

    async fn order_count(&self, credentials: &ShopCredentials) -> CoreResult<i64> {
        let data: OrdersCountData = self
            .execute(credentials, ORDERS_COUNT_QUERY, serde_json::json!({}))
            .await?;
        Ok(data.orders_count.count)
    }

    async fn customers_page(
        &self,
        credentials: &ShopCredentials,
        page_size: i64,
        cursor: Option<&str>,
    ) -> CoreResult<SourcePage<SourceCustomer>> {
        let variables = Self::page_variables(page_size, cursor)?;
        let data: CustomersPageData = self
            .execute(credentials, CUSTOMERS_PAGE_QUERY, variables)
            .await?;
        Ok(data.customers.into_source_page())
    }

    async fn orders_page(
        &self,
        credentials: &ShopCredentials,
        page_size: i64,
        cursor: Option<&str>,
    ) -> CoreResult<SourcePage<SourceOrder>> {
        let variables = Self::page_variables(page_size, cursor)?;
        let data: OrdersPageData = self
            .execute(credentials, ORDERS_PAGE_QUERY, variables)
            .await?;
        Ok(data.orders.into_source_page())
    }
}
