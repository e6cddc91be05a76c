//! External-platform payload shapes and the source-to-platform transforms.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use super::source_model::{SourceAddress, SourceCustomer, SourceOrder};
use crate::Result;

/// Contact shape for the platform's bulk `POST /contacts` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPayload {
    pub external_customer_id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItemPayload {
    pub title: String,
    pub quantity: i64,
    pub price: f64,
}

/// Order shape for the platform's bulk `POST /orders` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub external_order_id: String,
    pub external_customer_id: Option<String>,
    pub order_number: Option<String>,
    pub email: Option<String>,
    pub currency: Option<String>,
    pub total_price: f64,
    pub subtotal_price: f64,
    pub total_tax: f64,
    pub shipping_address: Option<String>,
    pub line_items: Vec<OrderLineItemPayload>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of one bulk upsert call. `failed_count` is the platform's own
/// report of records it rejected inside an otherwise successful call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub failed_count: i64,
}

/// Bulk write access to the external platform.
#[async_trait]
pub trait PlatformClientTrait: Send + Sync {
    async fn upsert_contacts(
        &self,
        api_key: &str,
        contacts: &[ContactPayload],
    ) -> Result<BulkOutcome>;

    async fn upsert_orders(&self, api_key: &str, orders: &[OrderPayload]) -> Result<BulkOutcome>;
}

/// Joins the non-empty address parts as
/// "first last, addr1, addr2, city, province, zip, country".
/// Returns `None` when every part is empty.
pub fn format_address(address: &SourceAddress) -> Option<String> {
    let name = [address.first_name.as_deref(), address.last_name.as_deref()]
        .iter()
        .filter_map(|part| normalize_part(*part))
        .collect::<Vec<_>>()
        .join(" ");

    let mut parts: Vec<String> = Vec::new();
    if !name.is_empty() {
        parts.push(name);
    }
    for part in [
        address.address1.as_deref(),
        address.address2.as_deref(),
        address.city.as_deref(),
        address.province.as_deref(),
        address.zip.as_deref(),
        address.country.as_deref(),
    ] {
        if let Some(value) = normalize_part(part) {
            parts.push(value.to_string());
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn normalize_part(part: Option<&str>) -> Option<&str> {
    part.map(str::trim).filter(|value| !value.is_empty())
}

/// Parses a source money string ("129.95") into an f64.
///
/// Float money mirrors what the platform accepts; precision drift on large
/// totals is a known, accepted risk. Unparseable input counts as 0.0.
pub fn parse_money(raw: Option<&str>) -> f64 {
    let Some(value) = normalize_part(raw) else {
        return 0.0;
    };
    match value.parse::<f64>() {
        Ok(amount) => amount,
        Err(_) => {
            warn!("Unparseable money amount '{}', substituting 0.0", value);
            0.0
        }
    }
}

impl From<&SourceCustomer> for ContactPayload {
    fn from(customer: &SourceCustomer) -> Self {
        ContactPayload {
            external_customer_id: customer.id.clone(),
            email: customer.email.clone(),
            first_name: customer.first_name.clone(),
            last_name: customer.last_name.clone(),
            phone: customer.phone.clone(),
            address: customer.default_address.as_ref().and_then(format_address),
        }
    }
}

impl From<&SourceOrder> for OrderPayload {
    fn from(order: &SourceOrder) -> Self {
        OrderPayload {
            external_order_id: order.id.clone(),
            external_customer_id: order.customer.as_ref().map(|c| c.id.clone()),
            order_number: order.name.clone(),
            email: order
                .email
                .clone()
                .or_else(|| order.customer.as_ref().and_then(|c| c.email.clone())),
            currency: order.currency_code.clone(),
            total_price: parse_money(order.total_price.as_deref()),
            subtotal_price: parse_money(order.subtotal_price.as_deref()),
            total_tax: parse_money(order.total_tax.as_deref()),
            shipping_address: order.shipping_address.as_ref().and_then(format_address),
            line_items: order
                .line_items
                .iter()
                .map(|item| OrderLineItemPayload {
                    title: item.title.clone(),
                    quantity: item.quantity,
                    price: parse_money(item.price.as_deref()),
                })
                .collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
