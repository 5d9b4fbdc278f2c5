//! Stock ledger models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockDirection {
    In,
    Out,
}

impl StockDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(StockDirection::In),
            "out" => Some(StockDirection::Out),
            _ => None,
        }
    }

    pub fn invert(&self) -> Self {
        match self {
            StockDirection::In => StockDirection::Out,
            StockDirection::Out => StockDirection::In,
        }
    }

    /// Sign applied to a quantity moving in this direction
    pub fn sign(&self) -> Decimal {
        match self {
            StockDirection::In => Decimal::ONE,
            StockDirection::Out => Decimal::NEGATIVE_ONE,
        }
    }
}

/// What produced a ledger entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerSource {
    PurchaseOrder,
    SalesInvoice,
    Manual,
}

impl LedgerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerSource::PurchaseOrder => "purchase_order",
            LedgerSource::SalesInvoice => "sales_invoice",
            LedgerSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "purchase_order" => Some(LedgerSource::PurchaseOrder),
            "sales_invoice" => Some(LedgerSource::SalesInvoice),
            "manual" => Some(LedgerSource::Manual),
            _ => None,
        }
    }
}

/// A stock ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub company_id: Uuid,
    pub product_id: Uuid,
    /// Numeric product id snapshot at write time
    pub product_numeric_id: i64,
    /// Product name snapshot at write time
    pub product_name: String,
    pub direction: StockDirection,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub source_type: LedgerSource,
    /// Absent for manual entries
    pub source_document_id: Option<Uuid>,
    pub source_line_index: Option<i32>,
    /// Order/invoice number, or the caller-supplied label for manual entries
    pub reference: Option<String>,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
