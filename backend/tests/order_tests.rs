//! Order document tests
//!
//! Tests for order document payload handling including:
//! - Loosely typed line item quantities and prices
//! - Pagination math for listing endpoints
//! - Direction of each document kind

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::{LineItem, OrderKind, StockDirection};
use shared::types::{Pagination, PaginationMeta};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Line items accept quantities as numbers or numeric strings
    #[test]
    fn test_line_item_loose_quantity() {
        let numeric: LineItem = serde_json::from_value(serde_json::json!({
            "category": "Tiles",
            "product": "Glazed Tile 600x600",
            "quantity": 7,
            "rate": "45.00",
            "total": 315.0
        }))
        .unwrap();

        assert_eq!(numeric.quantity, dec("7"));
        assert_eq!(numeric.rate, dec("45.00"));
        assert_eq!(numeric.total, dec("315.0"));
    }

    /// Non-numeric quantities coerce to zero rather than failing the request
    #[test]
    fn test_line_item_garbage_quantity_coerces_to_zero() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "category": "Tiles",
            "product": "Glazed Tile 600x600",
            "quantity": "abc",
            "rate": "45.00",
            "total": "x"
        }))
        .unwrap();

        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.total, Decimal::ZERO);
    }

    /// Missing quantity fields default to zero
    #[test]
    fn test_line_item_missing_fields_default() {
        let item: LineItem = serde_json::from_value(serde_json::json!({
            "category": "Tiles",
            "product": "Glazed Tile 600x600"
        }))
        .unwrap();

        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.rate, Decimal::ZERO);
    }

    /// Purchases move stock in, sales move it out
    #[test]
    fn test_document_kind_direction() {
        assert_eq!(OrderKind::PurchaseOrder.direction(), StockDirection::In);
        assert_eq!(OrderKind::SalesInvoice.direction(), StockDirection::Out);
    }

    /// Offsets are zero-based from a one-based page number
    #[test]
    fn test_pagination_offset() {
        let p = Pagination { page: 1, per_page: 20 };
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 20);

        let p = Pagination { page: 4, per_page: 25 };
        assert_eq!(p.offset(), 75);
    }

    /// Total pages rounds up
    #[test]
    fn test_pagination_meta_rounds_up() {
        assert_eq!(PaginationMeta::new(1, 20, 41).total_pages, 3);
        assert_eq!(PaginationMeta::new(1, 20, 40).total_pages, 2);
        assert_eq!(PaginationMeta::new(1, 20, 1).total_pages, 1);
        assert_eq!(PaginationMeta::new(1, 20, 0).total_pages, 0);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Numeric strings and numbers deserialize to the same quantity
        #[test]
        fn prop_string_and_number_agree(n in 0u32..1_000_000u32) {
            let as_number: LineItem = serde_json::from_value(serde_json::json!({
                "category": "C",
                "product": "P",
                "quantity": n
            }))
            .unwrap();
            let as_string: LineItem = serde_json::from_value(serde_json::json!({
                "category": "C",
                "product": "P",
                "quantity": n.to_string()
            }))
            .unwrap();

            prop_assert_eq!(as_number.quantity, as_string.quantity);
            prop_assert_eq!(as_number.quantity, Decimal::from(n));
        }

        /// Every item lands on exactly one page
        #[test]
        fn prop_pagination_covers_all_items(total in 0u64..10_000, per_page in 1u32..200) {
            let meta = PaginationMeta::new(1, per_page, total);
            let capacity = meta.total_pages as u64 * per_page as u64;

            prop_assert!(capacity >= total);
            if meta.total_pages > 0 {
                let previous_capacity = (meta.total_pages as u64 - 1) * per_page as u64;
                prop_assert!(previous_capacity < total);
            }
        }

        /// Offsets never overlap between consecutive pages
        #[test]
        fn prop_consecutive_pages_are_adjacent(page in 1u32..1000, per_page in 1u32..200) {
            let current = Pagination { page, per_page };
            let next = Pagination { page: page + 1, per_page };
            prop_assert_eq!(current.offset() + current.limit(), next.offset());
        }
    }
}
