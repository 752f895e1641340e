//! Availability engine.
//!
//! Pure functions over in-memory snapshots: how much of each material open
//! orders still need, how many units of a product current stock can build,
//! and the canonical order listing sequence. Nothing here touches the
//! database; callers load a consistent snapshot and pass it in.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::order::{self, OrderStatus};

/// Stock verdict for one material against aggregate open demand.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaterialStatus {
    Sufficient,
    Insufficient,
}

/// One order item's demand on a material, tagged with its order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemandLine {
    pub material_id: Uuid,
    pub order_status: OrderStatus,
    pub quantity_needed: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequirement {
    /// Sum of `quantity_needed` over open orders
    pub total_required: i64,
    pub status: MaterialStatus,
    /// `max(0, total_required - quantity)`
    pub shortage: i64,
}

impl MaterialRequirement {
    fn from_totals(on_hand: i32, total_required: i64) -> Self {
        let on_hand = i64::from(on_hand);
        let status = if total_required > on_hand {
            MaterialStatus::Insufficient
        } else {
            MaterialStatus::Sufficient
        };
        Self {
            total_required,
            status,
            shortage: (total_required - on_hand).max(0),
        }
    }
}

/// Requirement for a single material. Lines from completed or cancelled
/// orders are ignored, so pre-filtered and raw snapshots agree.
pub fn material_requirement<I>(on_hand: i32, lines: I) -> MaterialRequirement
where
    I: IntoIterator<Item = DemandLine>,
{
    let total_required = lines
        .into_iter()
        .filter(|line| line.order_status.is_open())
        .map(|line| i64::from(line.quantity_needed))
        .sum();
    MaterialRequirement::from_totals(on_hand, total_required)
}

/// Requirements for every material in `stock` (material id, on-hand
/// quantity) in a single pass over `lines`.
///
/// Materials without qualifying lines come back as 0 / sufficient / 0.
/// Lines referencing materials absent from `stock` are ignored.
pub fn aggregate_requirements<'a, S, L>(stock: S, lines: L) -> HashMap<Uuid, MaterialRequirement>
where
    S: IntoIterator<Item = (Uuid, i32)>,
    L: IntoIterator<Item = &'a DemandLine>,
{
    let stock: Vec<(Uuid, i32)> = stock.into_iter().collect();
    let mut totals: HashMap<Uuid, i64> = stock.iter().map(|(id, _)| (*id, 0)).collect();

    for line in lines {
        if !line.order_status.is_open() {
            continue;
        }
        if let Some(total) = totals.get_mut(&line.material_id) {
            *total += i64::from(line.quantity_needed);
        }
    }

    stock
        .into_iter()
        .map(|(id, on_hand)| {
            let total = totals.get(&id).copied().unwrap_or(0);
            (id, MaterialRequirement::from_totals(on_hand, total))
        })
        .collect()
}

/// One bill-of-materials line paired with the material's raw on-hand stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStock {
    pub quantity_required: i32,
    pub on_hand: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Buildability {
    pub can_make: bool,
    pub max_quantity: i64,
}

impl Buildability {
    const UNBUILDABLE: Self = Self {
        can_make: false,
        max_quantity: 0,
    };
}

/// Whether one unit can be built and how many units stock allows.
///
/// Uses raw on-hand stock; open orders are not netted out. A product with
/// no components, or with a non-positive requirement, is unbuildable.
pub fn buildability<I>(components: I) -> Buildability
where
    I: IntoIterator<Item = ComponentStock>,
{
    let mut can_make = true;
    let mut max_quantity: Option<i64> = None;

    for component in components {
        if component.quantity_required <= 0 {
            return Buildability::UNBUILDABLE;
        }
        let on_hand = i64::from(component.on_hand.max(0));
        let required = i64::from(component.quantity_required);

        can_make &= on_hand >= required;
        let units = on_hand / required;
        max_quantity = Some(max_quantity.map_or(units, |current| current.min(units)));
    }

    match max_quantity {
        Some(max_quantity) => Buildability {
            can_make,
            max_quantity,
        },
        None => Buildability::UNBUILDABLE,
    }
}

/// Listing rank: open work first, terminal states last.
pub fn status_rank(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::InProgress => 1,
        OrderStatus::Completed => 2,
        OrderStatus::Cancelled => 3,
    }
}

/// Fields that decide where an order appears in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSortKey {
    pub id: Uuid,
    pub status: OrderStatus,
    pub priority: Option<i32>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&order::Model> for OrderSortKey {
    fn from(model: &order::Model) -> Self {
        Self {
            id: model.id,
            status: model.status,
            priority: model.priority,
            due_date: model.due_date,
            created_at: model.created_at,
        }
    }
}

/// Status rank asc, priority desc (no priority last), due date asc (none
/// last), newest first, then id for a total order.
pub fn compare_orders(a: &OrderSortKey, b: &OrderSortKey) -> Ordering {
    status_rank(a.status)
        .cmp(&status_rank(b.status))
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_orders<T, F>(items: &mut [T], key: F)
where
    F: Fn(&T) -> OrderSortKey,
{
    items.sort_by(|a, b| compare_orders(&key(a), &key(b)));
}

/// Forward-only lifecycle with cancel from any open state.
///
/// Setting the current status again is always allowed.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;

    if from == to {
        return true;
    }

    match (from, to) {
        (Pending, InProgress) | (Pending, Completed) | (InProgress, Completed) => true,
        (Pending, Cancelled) | (InProgress, Cancelled) => true,
        _ => false,
    }
}
