//! Property-based tests for the availability engine.
//!
//! Requirement aggregation and buildability are checked against direct
//! recomputation over randomly generated stock and demand.

use std::collections::HashMap;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use tally::{
    entities::order::OrderStatus,
    services::availability::{
        aggregate_requirements, buildability, compare_orders, material_requirement,
        ComponentStock, DemandLine, MaterialStatus, OrderSortKey,
    },
};
use uuid::Uuid;

const MATERIALS: usize = 4;

fn material_ids() -> Vec<Uuid> {
    (1..=MATERIALS as u128).map(Uuid::from_u128).collect()
}

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop_oneof![
        Just(OrderStatus::Pending),
        Just(OrderStatus::InProgress),
        Just(OrderStatus::Completed),
        Just(OrderStatus::Cancelled),
    ]
}

fn line_strategy() -> impl Strategy<Value = DemandLine> {
    (0..MATERIALS, status_strategy(), 1i32..500).prop_map(|(idx, order_status, quantity)| {
        DemandLine {
            material_id: material_ids()[idx],
            order_status,
            quantity_needed: quantity,
        }
    })
}

fn stock_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(0i32..2_000, MATERIALS)
}

fn sort_key_strategy() -> impl Strategy<Value = OrderSortKey> {
    (
        any::<u128>(),
        status_strategy(),
        prop::option::of(0i32..=2),
        prop::option::of(0i64..100),
        0i64..100,
    )
        .prop_map(|(id, status, priority, due, created)| OrderSortKey {
            id: Uuid::from_u128(id),
            status,
            priority,
            due_date: due.map(|d| Utc.timestamp_opt(1_700_000_000 + d * 86_400, 0).unwrap()),
            created_at: Utc.timestamp_opt(1_690_000_000 + created * 3_600, 0).unwrap(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn shortage_matches_open_demand(stock in stock_strategy(), lines in prop::collection::vec(line_strategy(), 0..40)) {
        let ids = material_ids();
        let result = aggregate_requirements(ids.iter().copied().zip(stock.iter().copied()), &lines);

        prop_assert_eq!(result.len(), MATERIALS);
        for (id, on_hand) in ids.iter().zip(&stock) {
            let expected: i64 = lines
                .iter()
                .filter(|l| l.material_id == *id && l.order_status.is_open())
                .map(|l| i64::from(l.quantity_needed))
                .sum();
            let requirement = result[id];
            prop_assert_eq!(requirement.total_required, expected);
            prop_assert_eq!(requirement.shortage, (expected - i64::from(*on_hand)).max(0));
            prop_assert_eq!(
                requirement.status == MaterialStatus::Insufficient,
                requirement.shortage > 0
            );
        }
    }

    #[test]
    fn aggregation_ignores_line_order(stock in stock_strategy(), lines in prop::collection::vec(line_strategy(), 0..30)) {
        let ids = material_ids();
        let stock_pairs: Vec<(Uuid, i32)> = ids.iter().copied().zip(stock.iter().copied()).collect();

        let forward = aggregate_requirements(stock_pairs.iter().copied(), &lines);
        let mut reversed_lines = lines.clone();
        reversed_lines.reverse();
        let backward = aggregate_requirements(stock_pairs.iter().copied(), &reversed_lines);

        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn closed_orders_never_contribute(on_hand in 0i32..1_000, quantities in prop::collection::vec(1i32..500, 0..20)) {
        let id = Uuid::from_u128(7);
        let closed: Vec<DemandLine> = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| DemandLine {
                material_id: id,
                order_status: if i % 2 == 0 { OrderStatus::Completed } else { OrderStatus::Cancelled },
                quantity_needed: *q,
            })
            .collect();

        let requirement = material_requirement(on_hand, closed);

        prop_assert_eq!(requirement.total_required, 0);
        prop_assert_eq!(requirement.shortage, 0);
        prop_assert_eq!(requirement.status, MaterialStatus::Sufficient);
    }

    #[test]
    fn max_quantity_is_the_scarcest_floor(components in prop::collection::vec((1i32..50, 0i32..5_000), 1..6)) {
        let stock: Vec<ComponentStock> = components
            .iter()
            .map(|(required, on_hand)| ComponentStock { quantity_required: *required, on_hand: *on_hand })
            .collect();

        let result = buildability(stock.iter().copied());

        let expected_max = components
            .iter()
            .map(|(required, on_hand)| i64::from(*on_hand / *required))
            .min()
            .unwrap();
        prop_assert_eq!(result.max_quantity, expected_max);
        prop_assert_eq!(
            result.can_make,
            components.iter().all(|(required, on_hand)| on_hand >= required)
        );
        prop_assert_eq!(result.can_make, result.max_quantity >= 1);
    }

    #[test]
    fn engine_is_idempotent(stock in stock_strategy(), lines in prop::collection::vec(line_strategy(), 0..20)) {
        let ids = material_ids();
        let pairs: Vec<(Uuid, i32)> = ids.iter().copied().zip(stock.iter().copied()).collect();

        let first: HashMap<_, _> = aggregate_requirements(pairs.iter().copied(), &lines);
        let second: HashMap<_, _> = aggregate_requirements(pairs.iter().copied(), &lines);

        prop_assert_eq!(first, second);
    }

    #[test]
    fn order_comparison_is_a_total_order(mut keys in prop::collection::vec(sort_key_strategy(), 0..30)) {
        keys.sort_by(compare_orders);
        for pair in keys.windows(2) {
            prop_assert_ne!(compare_orders(&pair[0], &pair[1]), std::cmp::Ordering::Greater);
        }

        let mut shuffled = keys.clone();
        shuffled.reverse();
        shuffled.sort_by(compare_orders);
        prop_assert_eq!(keys, shuffled);
    }
}
