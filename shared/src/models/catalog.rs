//! Catalog models: categories, products and bundle membership

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A product category, unique by name within a company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How stock movements affect a product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockTrackingMode {
    /// Stock quantity moves with every order line and manual adjustment
    Tracked,
    /// Reconciliation skips the product entirely
    Untracked,
    /// Order lines fan out to the bundle's component products
    Bundle,
}

impl StockTrackingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockTrackingMode::Tracked => "tracked",
            StockTrackingMode::Untracked => "untracked",
            StockTrackingMode::Bundle => "bundle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tracked" => Some(StockTrackingMode::Tracked),
            "untracked" => Some(StockTrackingMode::Untracked),
            "bundle" => Some(StockTrackingMode::Bundle),
            _ => None,
        }
    }

    /// Whether manual stock adjustments may target this mode.
    ///
    /// Bundles qualify: their own quantity only moves through manual
    /// entries, never through order reconciliation.
    pub fn adjustable(&self) -> bool {
        !matches!(self, StockTrackingMode::Untracked)
    }
}

/// Derived stock availability flag
///
/// Observational only: recomputed from the quantity after every change,
/// never an input to reconciliation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    InStock,
    OutOfStock,
}

impl StockState {
    pub fn from_quantity(quantity: Decimal) -> Self {
        if quantity > Decimal::ZERO {
            StockState::InStock
        } else {
            StockState::OutOfStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockState::InStock => "in_stock",
            StockState::OutOfStock => "out_of_stock",
        }
    }
}

/// A catalog product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    /// Human-facing per-tenant numeric id
    pub product_id: i64,
    pub company_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub hsn_code: Option<String>,
    pub grade: Option<String>,
    pub model_number: Option<String>,
    pub design_name: Option<String>,
    pub finish_glaze: Option<String>,
    pub sale_price: Option<Decimal>,
    pub stock_quantity: Decimal,
    pub tracking_mode: StockTrackingMode,
    pub stock_state: StockState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A bundle membership row linking a bundle product to a component product
///
/// Repeated rows for the same component form a multiset: a bundle holding a
/// component twice moves twice the quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleItem {
    pub id: Uuid,
    pub company_id: Uuid,
    pub bundle_product_id: Uuid,
    pub component_product_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_state_from_quantity() {
        assert_eq!(
            StockState::from_quantity(Decimal::from(1)),
            StockState::InStock
        );
        assert_eq!(StockState::from_quantity(Decimal::ZERO), StockState::OutOfStock);
        assert_eq!(
            StockState::from_quantity(Decimal::from(-2)),
            StockState::OutOfStock
        );
    }

    #[test]
    fn test_tracking_mode_round_trip() {
        for mode in [
            StockTrackingMode::Tracked,
            StockTrackingMode::Untracked,
            StockTrackingMode::Bundle,
        ] {
            assert_eq!(StockTrackingMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(StockTrackingMode::parse("serialized"), None);
    }
}
