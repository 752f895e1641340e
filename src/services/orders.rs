use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        material::{self, Model as MaterialModel},
        order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
        order_item::{self, Model as OrderItemModel},
    },
    errors::ServiceError,
    services::{availability, non_blank, parse_due_date, present, validate_priority},
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OrderItemInput {
    pub material_id: Uuid,
    #[validate(range(min = 1, message = "Quantity needed must be at least 1"))]
    pub quantity_needed: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub due_date: Option<String>,
    pub priority: Option<i32>,
    #[validate(length(min = 1, message = "At least one order item is required"))]
    pub order_items: Vec<OrderItemInput>,
}

/// Partial update. An absent key leaves the field alone; `null` clears it.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i32>)]
    pub priority: Option<Option<i32>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub due_date: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    #[serde(flatten)]
    pub item: OrderItemModel,
    pub material: Option<MaterialModel>,
}

/// An order with its material lines
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: OrderModel,
    pub order_items: Vec<OrderItemView>,
}

/// Validated input for a new order, shared with product-driven creation.
#[derive(Debug, Clone)]
pub(crate) struct NewOrder {
    pub name: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: i32,
    pub items: Vec<(Uuid, i32)>,
}

/// Fails unless every id names a material owned by `user_id`.
pub(crate) async fn ensure_materials_owned<C>(
    db: &C,
    user_id: Uuid,
    material_ids: impl IntoIterator<Item = Uuid>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let ids: HashSet<Uuid> = material_ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(());
    }

    let found = material::Entity::find()
        .filter(material::Column::UserId.eq(user_id))
        .filter(material::Column::Id.is_in(ids.iter().copied()))
        .count(db)
        .await?;

    if found != ids.len() as u64 {
        warn!(%user_id, requested = ids.len(), found, "Order references unknown materials");
        return Err(ServiceError::InvalidInput(
            "One or more materials not found".to_string(),
        ));
    }
    Ok(())
}

/// Inserts an order and its items with status PENDING.
pub(crate) async fn insert_order<C>(
    db: &C,
    user_id: Uuid,
    new_order: NewOrder,
) -> Result<OrderModel, ServiceError>
where
    C: ConnectionTrait,
{
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        name: Set(new_order.name),
        status: Set(OrderStatus::Pending),
        priority: Set(Some(new_order.priority)),
        due_date: Set(new_order.due_date),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to insert order");
        ServiceError::DatabaseError(e)
    })?;

    for (material_id, quantity_needed) in new_order.items {
        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            material_id: Set(material_id),
            quantity_needed: Set(quantity_needed),
        }
        .insert(db)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order.id, "Failed to insert order item");
            ServiceError::DatabaseError(e)
        })?;
    }

    Ok(order)
}

/// Attaches items (with their materials) to each order, keeping input order.
pub(crate) async fn load_order_views<C>(
    db: &C,
    orders: Vec<OrderModel>,
) -> Result<Vec<OrderView>, ServiceError>
where
    C: ConnectionTrait,
{
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids))
        .find_also_related(material::Entity)
        .all(db)
        .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItemView>> = HashMap::new();
    for (item, material) in rows {
        by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItemView { item, material });
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let mut order_items = by_order.remove(&order.id).unwrap_or_default();
            order_items.sort_by(|a, b| {
                let name = |v: &OrderItemView| v.material.as_ref().map(|m| m.name.clone());
                name(a).cmp(&name(b)).then_with(|| a.item.id.cmp(&b.item.id))
            });
            OrderView { order, order_items }
        })
        .collect())
}

/// Service for production orders
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    enforce_status_transitions: bool,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, enforce_status_transitions: bool) -> Self {
        Self {
            db_pool,
            enforce_status_transitions,
        }
    }

    /// All orders of a user in listing order
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list orders");
                ServiceError::DatabaseError(e)
            })?;

        let mut views = load_order_views(&*self.db_pool, orders).await?;
        availability::sort_orders(&mut views, |view| (&view.order).into());
        Ok(views)
    }

    pub async fn get_order(&self, user_id: Uuid, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let order = self.find_owned(&*self.db_pool, user_id, order_id).await?;
        self.single_view(&*self.db_pool, order).await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        request.validate()?;
        for item in &request.order_items {
            item.validate()?;
        }
        validate_priority(request.priority)?;

        let name = non_blank(Some(request.name))
            .ok_or_else(|| ServiceError::ValidationError("Name is required".to_string()))?;
        let due_date = request
            .due_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_due_date)
            .transpose()?;

        let txn = self.db_pool.begin().await?;
        ensure_materials_owned(&txn, user_id, request.order_items.iter().map(|i| i.material_id))
            .await?;

        let order = insert_order(
            &txn,
            user_id,
            NewOrder {
                name,
                due_date,
                priority: request.priority.unwrap_or(0),
                items: request
                    .order_items
                    .iter()
                    .map(|i| (i.material_id, i.quantity_needed))
                    .collect(),
            },
        )
        .await?;
        let view = self.single_view(&txn, order).await?;
        txn.commit().await?;

        info!(order_id = %view.order.id, items = view.order_items.len(), "Order created");
        Ok(view)
    }

    /// Changes status, priority or due date.
    #[instrument(skip(self, request))]
    pub async fn update_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
        request: UpdateOrderRequest,
    ) -> Result<OrderView, ServiceError> {
        let next_status = request
            .status
            .as_deref()
            .map(|raw| {
                OrderStatus::from_str(raw.trim()).map_err(|_| {
                    ServiceError::InvalidStatus(format!("'{}' is not a valid order status", raw))
                })
            })
            .transpose()?;
        if let Some(priority) = request.priority {
            validate_priority(priority)?;
        }
        let due_date = match request.due_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.trim().is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(parse_due_date(&raw)?)),
        };

        let txn = self.db_pool.begin().await?;
        let current = self.find_owned(&txn, user_id, order_id).await?;
        let previous_status = current.status;

        if let Some(next) = next_status {
            if self.enforce_status_transitions
                && !availability::is_valid_transition(previous_status, next)
            {
                return Err(ServiceError::InvalidStatus(format!(
                    "Cannot change order status from {} to {}",
                    previous_status, next
                )));
            }
        }

        let mut active: order::ActiveModel = current.into();
        if let Some(next) = next_status {
            active.status = Set(next);
        }
        if let Some(priority) = request.priority {
            active.priority = Set(priority);
        }
        if let Some(due_date) = due_date {
            active.due_date = Set(due_date);
        }

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to update order");
            ServiceError::DatabaseError(e)
        })?;
        let view = self.single_view(&txn, updated).await?;
        txn.commit().await?;

        if previous_status != view.order.status {
            info!(%order_id, from = %previous_status, to = %view.order.status, "Order status changed");
        }
        Ok(view)
    }

    /// Removes an order and its items.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, user_id: Uuid, order_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db_pool.begin().await?;
        self.find_owned(&txn, user_id, order_id).await?;

        order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await?;
        OrderEntity::delete_by_id(order_id).exec(&txn).await.map_err(|e| {
            error!(error = %e, %order_id, "Failed to delete order");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await?;
        info!(%order_id, "Order deleted");
        Ok(())
    }

    async fn find_owned<C>(
        &self,
        db: &C,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderModel, ServiceError>
    where
        C: ConnectionTrait,
    {
        OrderEntity::find_by_id(order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))
    }

    async fn single_view<C>(&self, db: &C, order: OrderModel) -> Result<OrderView, ServiceError>
    where
        C: ConnectionTrait,
    {
        load_order_views(db, vec![order])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Order vanished while loading".to_string()))
    }
}
