//! Wire shapes of the Admin GraphQL API, converted into core source models
//! at the crate boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopsync_core::sync::{
    SourceAddress, SourceCustomer, SourceCustomerRef, SourceLineItem, SourceOrder, SourcePage,
};

/// GraphQL request envelope.
#[derive(Debug, Serialize)]
pub(crate) struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: serde_json::Value,
}

/// GraphQL response envelope. `errors` may accompany a partial or null
/// `data` even on HTTP 200.
#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

/// Cursor-paged connection as queried with `nodes` + `pageInfo`.
#[derive(Debug, Deserialize)]
pub(crate) struct Connection<T> {
    pub nodes: Vec<T>,
    #[serde(rename = "pageInfo")]
    pub page_info: PageInfo,
}

impl<T> Connection<T> {
    pub(crate) fn into_source_page<U: From<T>>(self) -> SourcePage<U> {
        SourcePage {
            nodes: self.nodes.into_iter().map(U::from).collect(),
            end_cursor: self.page_info.end_cursor,
            has_next_page: self.page_info.has_next_page,
        }
    }
}

/// Nested connection queried without page info (order line items).
#[derive(Debug, Deserialize)]
pub(crate) struct NodeList<T> {
    pub nodes: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountNode {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomersCountData {
    pub customers_count: CountNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrdersCountData {
    pub orders_count: CountNode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomersPageData {
    pub customers: Connection<CustomerNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrdersPageData {
    pub orders: Connection<OrderNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddressNode {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address1: Option<String>,
    pub address2: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
}

impl From<AddressNode> for SourceAddress {
    fn from(node: AddressNode) -> Self {
        SourceAddress {
            first_name: node.first_name,
            last_name: node.last_name,
            address1: node.address1,
            address2: node.address2,
            city: node.city,
            province: node.province,
            zip: node.zip,
            country: node.country,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomerNode {
    pub id: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub default_address: Option<AddressNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CustomerNode> for SourceCustomer {
    fn from(node: CustomerNode) -> Self {
        SourceCustomer {
            id: node.id,
            email: node.email,
            first_name: node.first_name,
            last_name: node.last_name,
            phone: node.phone,
            default_address: node.default_address.map(SourceAddress::from),
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}

/// Money value inside a money bag; the amount is a string decimal.
#[derive(Debug, Deserialize)]
pub(crate) struct MoneyNode {
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MoneyBagNode {
    pub shop_money: MoneyNode,
}

fn money_amount(bag: MoneyBagNode) -> String {
    bag.shop_money.amount
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LineItemNode {
    pub title: String,
    pub quantity: i64,
    pub original_unit_price_set: Option<MoneyBagNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CustomerRefNode {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OrderNode {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub currency_code: Option<String>,
    pub total_price_set: Option<MoneyBagNode>,
    pub subtotal_price_set: Option<MoneyBagNode>,
    pub total_tax_set: Option<MoneyBagNode>,
    pub customer: Option<CustomerRefNode>,
    pub shipping_address: Option<AddressNode>,
    pub line_items: NodeList<LineItemNode>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderNode> for SourceOrder {
    fn from(node: OrderNode) -> Self {
        SourceOrder {
            id: node.id,
            name: node.name,
            email: node.email,
            currency_code: node.currency_code,
            total_price: node.total_price_set.map(money_amount),
            subtotal_price: node.subtotal_price_set.map(money_amount),
            total_tax: node.total_tax_set.map(money_amount),
            customer: node.customer.map(|customer| SourceCustomerRef {
                id: customer.id,
                email: customer.email,
            }),
            shipping_address: node.shipping_address.map(SourceAddress::from),
            line_items: node
                .line_items
                .nodes
                .into_iter()
                .map(|item| SourceLineItem {
                    title: item.title,
                    quantity: item.quantity,
                    price: item.original_unit_price_set.map(money_amount),
                })
                .collect(),
            created_at: node.created_at,
            updated_at: node.updated_at,
        }
    }
}
