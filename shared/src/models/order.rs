//! Order document models: purchase orders and sales invoices

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::StockDirection;
use crate::validation::deserialize_loose_decimal;

/// The two kinds of order document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    PurchaseOrder,
    SalesInvoice,
}

impl OrderKind {
    /// Stock direction of applying a document of this kind
    pub fn direction(&self) -> StockDirection {
        match self {
            OrderKind::PurchaseOrder => StockDirection::In,
            OrderKind::SalesInvoice => StockDirection::Out,
        }
    }
}

/// A line item on an order document
///
/// Products are identified by name within a named category; ids are resolved
/// server side. Quantity and prices are loosely typed on the wire: JSON
/// numbers and numeric strings are both accepted, anything else coerces to
/// zero.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LineItem {
    pub category: String,
    pub product: String,
    #[serde(default)]
    pub hsn_code: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
    #[serde(default)]
    pub model_number: Option<String>,
    #[serde(default)]
    pub finish_glaze: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_decimal")]
    pub quantity: Decimal,
    #[serde(default, deserialize_with = "deserialize_loose_decimal")]
    pub rate: Decimal,
    #[serde(default, deserialize_with = "deserialize_loose_decimal")]
    pub sale_price: Decimal,
    #[serde(default, deserialize_with = "deserialize_loose_decimal")]
    pub total: Decimal,
}

/// Counterparty on an order document (supplier or customer)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Counterparty {
    pub name: String,
    #[serde(default)]
    pub gstin: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Input payload shared by both document kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDocumentInput {
    pub number: String,
    pub date: NaiveDate,
    pub counterparty: Counterparty,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, deserialize_with = "deserialize_loose_decimal")]
    pub total_amount: Decimal,
}
