//! Stock ledger tests
//!
//! Tests for manual stock adjustments including:
//! - Quantity validation (positive, numeric, loosely typed)
//! - Editing an entry applies only the difference
//! - Deleting an entry reverts its full effect

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::StockDirection;
use shared::validation::{coerce_decimal, validate_adjustment_quantity};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// Effect a manual entry has on its product's balance
fn entry_effect(direction: StockDirection, quantity: Decimal) -> Decimal {
    direction.sign() * quantity
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Adjustment quantities accept numbers and numeric strings
    #[test]
    fn test_loose_quantity_accepted() {
        assert_eq!(coerce_decimal(&serde_json::json!(7)), dec("7"));
        assert_eq!(coerce_decimal(&serde_json::json!("7")), dec("7"));
        assert_eq!(coerce_decimal(&serde_json::json!("12.5")), dec("12.5"));
    }

    /// Non-numeric quantities coerce to zero and fail validation
    #[test]
    fn test_non_numeric_quantity_rejected() {
        let coerced = coerce_decimal(&serde_json::json!("abc"));
        assert_eq!(coerced, Decimal::ZERO);
        assert!(validate_adjustment_quantity(coerced).is_err());
    }

    /// Zero and negative quantities are rejected
    #[test]
    fn test_non_positive_quantity_rejected() {
        assert!(validate_adjustment_quantity(Decimal::ZERO).is_err());
        assert!(validate_adjustment_quantity(dec("-5")).is_err());
        assert!(validate_adjustment_quantity(dec("0.001")).is_ok());
    }

    /// Inbound adds, outbound subtracts
    #[test]
    fn test_entry_effect_direction() {
        assert_eq!(entry_effect(StockDirection::In, dec("10")), dec("10"));
        assert_eq!(entry_effect(StockDirection::Out, dec("10")), dec("-10"));
    }

    /// Editing an entry applies only the quantity difference
    #[test]
    fn test_edit_applies_difference() {
        let mut balance = dec("50");
        let direction = StockDirection::In;
        let old_quantity = dec("10");
        let new_quantity = dec("7");

        let diff = direction.sign() * (new_quantity - old_quantity);
        balance += diff;

        // Entry originally added 10; shrinking it to 7 removes 3
        assert_eq!(balance, dec("47"));
    }

    /// Deleting an entry reverts its full effect
    #[test]
    fn test_delete_reverts_effect() {
        let mut balance = dec("50");
        let effect = entry_effect(StockDirection::Out, dec("8"));
        balance += effect;
        assert_eq!(balance, dec("42"));

        balance -= effect;
        assert_eq!(balance, dec("50"));
    }

    /// Manual adjustments may target tracked and bundle products
    #[test]
    fn test_adjustable_tracking_modes() {
        use shared::models::StockTrackingMode;

        assert!(StockTrackingMode::Tracked.adjustable());
        assert!(StockTrackingMode::Bundle.adjustable());
        assert!(!StockTrackingMode::Untracked.adjustable());
    }

    /// Stock state follows the quantity sign
    #[test]
    fn test_stock_state_from_quantity() {
        use shared::models::StockState;

        assert_eq!(StockState::from_quantity(dec("1")), StockState::InStock);
        assert_eq!(StockState::from_quantity(Decimal::ZERO), StockState::OutOfStock);
        assert_eq!(StockState::from_quantity(dec("-2")), StockState::OutOfStock);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_quantity() -> impl Strategy<Value = Decimal> {
        (1u32..1_000_000).prop_map(|n| Decimal::from(n) / Decimal::from(100))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Create-then-delete leaves the balance untouched
        #[test]
        fn prop_create_delete_round_trip(start in arb_quantity(), qty in arb_quantity()) {
            let mut balance = start;
            let effect = entry_effect(StockDirection::Out, qty);
            balance += effect;
            balance -= effect;
            prop_assert_eq!(balance, start);
        }

        /// Editing to the same quantity is a no-op
        #[test]
        fn prop_edit_to_same_quantity_is_noop(start in arb_quantity(), qty in arb_quantity()) {
            let mut balance = start;
            let diff = StockDirection::In.sign() * (qty - qty);
            balance += diff;
            prop_assert_eq!(balance, start);
        }

        /// Any positive quantity validates; its negation never does
        #[test]
        fn prop_positive_validates(qty in arb_quantity()) {
            prop_assert!(validate_adjustment_quantity(qty).is_ok());
            prop_assert!(validate_adjustment_quantity(-qty).is_err());
        }
    }
}
