//! Stock reconciliation tests
//!
//! Tests for the document reconciliation planner including:
//! - Apply/revert round trip restores every balance
//! - Bundle lines fan out to components without moving the bundle itself
//! - Untracked products never change quantity
//! - Applying the same document twice doubles its effect

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::StockDirection;
use shared::reconciliation::{
    plan_apply, plan_revert, ProductRef, Resolution, ResolvedLine,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn product(name: &str, numeric_id: i64, sale_price: &str) -> ProductRef {
    ProductRef {
        id: Uuid::new_v4(),
        numeric_id,
        name: name.to_string(),
        sale_price: dec(sale_price),
    }
}

fn tracked_line(index: usize, p: &ProductRef, qty: &str, rate: &str) -> ResolvedLine {
    ResolvedLine {
        index,
        quantity: dec(qty),
        rate: dec(rate),
        total: dec(qty) * dec(rate),
        resolution: Resolution::Tracked(p.clone()),
    }
}

/// In-memory stock balances keyed by product id
type Balances = BTreeMap<Uuid, Decimal>;

fn apply_plan(balances: &mut Balances, plan: &shared::reconciliation::ReconciliationPlan) {
    plan.apply_to(balances);
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Purchase 10, sell 3, sell 2 leaves 5 in stock
    #[test]
    fn test_purchase_then_sales_sequence() {
        let tile = product("Glazed Tile 600x600", 1, "45.00");
        let mut balances = Balances::new();
        balances.insert(tile.id, Decimal::ZERO);

        let purchase = plan_apply(
            StockDirection::In,
            &[tracked_line(0, &tile, "10", "40.00")],
        );
        apply_plan(&mut balances, &purchase);
        assert_eq!(balances[&tile.id], dec("10"));

        let sale_a = plan_apply(StockDirection::Out, &[tracked_line(0, &tile, "3", "45.00")]);
        apply_plan(&mut balances, &sale_a);
        assert_eq!(balances[&tile.id], dec("7"));

        let sale_b = plan_apply(StockDirection::Out, &[tracked_line(0, &tile, "2", "45.00")]);
        apply_plan(&mut balances, &sale_b);
        assert_eq!(balances[&tile.id], dec("5"));

        // Reverting both sales restores the post-purchase balance
        apply_plan(
            &mut balances,
            &plan_revert(StockDirection::Out, &[tracked_line(0, &tile, "3", "45.00")]),
        );
        apply_plan(
            &mut balances,
            &plan_revert(StockDirection::Out, &[tracked_line(0, &tile, "2", "45.00")]),
        );
        assert_eq!(balances[&tile.id], dec("10"));
    }

    /// A bundle sale moves each component, never the bundle itself
    #[test]
    fn test_bundle_fan_out() {
        let bundle = product("Bathroom Set", 5, "500.00");
        let basin = product("Wash Basin", 6, "300.00");
        let tap = product("Tap Set", 7, "150.00");

        let mut balances = Balances::new();
        balances.insert(bundle.id, dec("4"));
        balances.insert(basin.id, dec("20"));
        balances.insert(tap.id, dec("20"));

        let line = ResolvedLine {
            index: 0,
            quantity: dec("2"),
            rate: dec("500.00"),
            total: dec("1000.00"),
            resolution: Resolution::Bundle {
                product: bundle.clone(),
                components: vec![basin.clone(), tap.clone()],
            },
        };

        let plan = plan_apply(StockDirection::Out, &[line]);
        apply_plan(&mut balances, &plan);

        assert_eq!(balances[&bundle.id], dec("4"));
        assert_eq!(balances[&basin.id], dec("18"));
        assert_eq!(balances[&tap.id], dec("18"));

        // One ledger entry per component, priced at the component sale price
        // with a zero total
        assert_eq!(plan.entries.len(), 2);
        for entry in &plan.entries {
            assert_eq!(entry.total, Decimal::ZERO);
        }
        assert_eq!(plan.entries[0].unit_price, dec("300.00"));
        assert_eq!(plan.entries[1].unit_price, dec("150.00"));
    }

    /// Untracked lines produce no deltas and no entries
    #[test]
    fn test_untracked_line_has_no_effect() {
        let service_fee = product("Delivery Charge", 9, "0.00");
        let line = ResolvedLine {
            index: 0,
            quantity: dec("3"),
            rate: dec("100.00"),
            total: dec("300.00"),
            resolution: Resolution::Untracked(service_fee.clone()),
        };

        let plan = plan_apply(StockDirection::Out, &[line]);
        assert!(plan.deltas.is_empty());
        assert!(plan.entries.is_empty());
        assert!(plan.warnings.is_empty());
    }

    /// Applying the same document twice doubles its effect
    #[test]
    fn test_double_apply_doubles_effect() {
        let tile = product("Glazed Tile 600x600", 1, "45.00");
        let mut balances = Balances::new();
        balances.insert(tile.id, dec("10"));

        let lines = [tracked_line(0, &tile, "4", "45.00")];
        let plan = plan_apply(StockDirection::Out, &lines);

        apply_plan(&mut balances, &plan);
        apply_plan(&mut balances, &plan);

        assert_eq!(balances[&tile.id], dec("2"));
    }

    /// Unresolved lines surface as warnings carrying the line index
    #[test]
    fn test_unresolved_line_warns() {
        let line = ResolvedLine {
            index: 2,
            quantity: dec("1"),
            rate: dec("10.00"),
            total: dec("10.00"),
            resolution: Resolution::Unresolved {
                reason: "Product 'Ghost' not found in category 'Tiles'".to_string(),
            },
        };

        let plan = plan_apply(StockDirection::In, &[line]);
        assert!(plan.deltas.is_empty());
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].line_index, 2);
    }

    /// Stock may go negative; no clamping happens anywhere
    #[test]
    fn test_negative_stock_allowed() {
        let tile = product("Glazed Tile 600x600", 1, "45.00");
        let mut balances = Balances::new();
        balances.insert(tile.id, dec("2"));

        let plan = plan_apply(StockDirection::Out, &[tracked_line(0, &tile, "5", "45.00")]);
        apply_plan(&mut balances, &plan);

        assert_eq!(balances[&tile.id], dec("-3"));
    }

    /// A mixed document reverted in full restores every balance
    #[test]
    fn test_mixed_document_round_trip() {
        let tile = product("Glazed Tile 600x600", 1, "45.00");
        let bundle = product("Bathroom Set", 5, "500.00");
        let basin = product("Wash Basin", 6, "300.00");
        let tap = product("Tap Set", 7, "150.00");
        let fee = product("Delivery Charge", 9, "0.00");

        let mut balances = Balances::new();
        balances.insert(tile.id, dec("100"));
        balances.insert(bundle.id, dec("50"));
        balances.insert(basin.id, dec("20"));
        balances.insert(tap.id, dec("20"));
        balances.insert(fee.id, Decimal::ZERO);
        let before = balances.clone();

        let lines = [
            tracked_line(0, &tile, "10", "45.00"),
            ResolvedLine {
                index: 1,
                quantity: dec("2"),
                rate: dec("500.00"),
                total: dec("1000.00"),
                resolution: Resolution::Bundle {
                    product: bundle.clone(),
                    components: vec![basin.clone(), tap.clone()],
                },
            },
            ResolvedLine {
                index: 2,
                quantity: dec("1"),
                rate: dec("100.00"),
                total: dec("100.00"),
                resolution: Resolution::Untracked(fee.clone()),
            },
        ];

        apply_plan(&mut balances, &plan_apply(StockDirection::Out, &lines));
        assert_eq!(balances[&tile.id], dec("90"));
        assert_eq!(balances[&basin.id], dec("18"));
        assert_eq!(balances[&tap.id], dec("18"));
        assert_eq!(balances[&bundle.id], dec("50"));

        apply_plan(&mut balances, &plan_revert(StockDirection::Out, &lines));
        assert_eq!(balances, before);
    }

    /// Zero-quantity tracked lines still produce a ledger entry
    #[test]
    fn test_zero_quantity_still_writes_entry() {
        let tile = product("Glazed Tile 600x600", 1, "45.00");
        let plan = plan_apply(StockDirection::In, &[tracked_line(0, &tile, "0", "40.00")]);

        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].quantity, Decimal::ZERO);
        assert!(plan.merged_deltas().values().all(|d| *d == Decimal::ZERO));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_quantity() -> impl Strategy<Value = Decimal> {
        (0u32..100_000).prop_map(|n| Decimal::from(n) / Decimal::from(100))
    }

    fn arb_lines() -> impl Strategy<Value = Vec<ResolvedLine>> {
        prop::collection::vec((arb_quantity(), 0u8..3), 1..8).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(index, (quantity, kind))| {
                    let p = product(&format!("Product {}", index), index as i64 + 1, "10.00");
                    let resolution = match kind {
                        0 => Resolution::Tracked(p),
                        1 => Resolution::Untracked(p),
                        _ => Resolution::Bundle {
                            product: p,
                            components: vec![
                                product(&format!("Component {}a", index), 100 + index as i64, "5.00"),
                                product(&format!("Component {}b", index), 200 + index as i64, "5.00"),
                            ],
                        },
                    };
                    ResolvedLine {
                        index,
                        quantity,
                        rate: dec("10.00"),
                        total: quantity * dec("10.00"),
                        resolution,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        /// Apply followed by revert nets to zero on every product
        #[test]
        fn prop_apply_revert_nets_zero(lines in arb_lines()) {
            let mut balances = Balances::new();
            plan_apply(StockDirection::Out, &lines).apply_to(&mut balances);
            plan_revert(StockDirection::Out, &lines).apply_to(&mut balances);

            for delta in balances.values() {
                prop_assert_eq!(*delta, Decimal::ZERO);
            }
        }

        /// Untracked products never appear among the deltas
        #[test]
        fn prop_untracked_never_moves(lines in arb_lines()) {
            let plan = plan_apply(StockDirection::In, &lines);
            let untracked: Vec<Uuid> = lines
                .iter()
                .filter_map(|l| match &l.resolution {
                    Resolution::Untracked(p) => Some(p.id),
                    _ => None,
                })
                .collect();

            for delta in &plan.deltas {
                prop_assert!(!untracked.contains(&delta.product_id));
            }
        }

        /// One entry per tracked line, one per bundle component
        #[test]
        fn prop_entry_count_matches_lines(lines in arb_lines()) {
            let plan = plan_apply(StockDirection::Out, &lines);
            let expected: usize = lines
                .iter()
                .map(|l| match &l.resolution {
                    Resolution::Tracked(_) => 1,
                    Resolution::Bundle { components, .. } => components.len(),
                    _ => 0,
                })
                .sum();

            prop_assert_eq!(plan.entries.len(), expected);
        }

        /// Direction only flips the sign of the effect
        #[test]
        fn prop_directions_are_symmetric(qty in arb_quantity()) {
            let tile = product("Glazed Tile 600x600", 1, "45.00");
            let lines = [tracked_line(0, &tile, &qty.to_string(), "45.00")];

            let inbound = plan_apply(StockDirection::In, &lines);
            let outbound = plan_apply(StockDirection::Out, &lines);

            let in_delta = inbound.merged_deltas().remove(&tile.id).unwrap_or_default();
            let out_delta = outbound.merged_deltas().remove(&tile.id).unwrap_or_default();
            prop_assert_eq!(in_delta, -out_delta);
        }
    }
}
