use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        material::{self, Entity as MaterialEntity, Model as MaterialModel},
        order::{self, OrderStatus},
        order_item,
    },
    errors::ServiceError,
    services::{
        availability::{self, DemandLine, MaterialRequirement},
        non_blank,
    },
};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(length(max = 20))]
    pub size: Option<String>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[validate(range(min = 1, message = "Pack size must be at least 1"))]
    pub pack_size: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AdjustQuantityRequest {
    /// Signed change; the result is floored at zero
    pub delta: i32,
}

/// An open order contributing demand to a material
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenOrderDemand {
    pub order_id: Uuid,
    pub name: String,
    pub status: OrderStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub quantity_needed: i32,
}

/// A material with its aggregate open demand
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequirementView {
    #[serde(flatten)]
    pub material: MaterialModel,
    #[serde(flatten)]
    pub requirement: MaterialRequirement,
    pub open_orders: Vec<OpenOrderDemand>,
}

/// Service for material stock and demand
#[derive(Clone)]
pub struct MaterialService {
    db_pool: Arc<DbPool>,
    default_pack_size: i32,
}

impl MaterialService {
    pub fn new(db_pool: Arc<DbPool>, default_pack_size: i32) -> Self {
        Self {
            db_pool,
            default_pack_size,
        }
    }

    /// Materials ordered by name, color, size
    #[instrument(skip(self))]
    pub async fn list_materials(&self, user_id: Uuid) -> Result<Vec<MaterialModel>, ServiceError> {
        MaterialEntity::find()
            .filter(material::Column::UserId.eq(user_id))
            .order_by_asc(material::Column::Name)
            .order_by_asc(material::Column::Color)
            .order_by_asc(material::Column::Size)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list materials");
                ServiceError::DatabaseError(e)
            })
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_material(
        &self,
        user_id: Uuid,
        request: CreateMaterialRequest,
    ) -> Result<MaterialModel, ServiceError> {
        request.validate()?;
        let name = non_blank(Some(request.name))
            .ok_or_else(|| ServiceError::ValidationError("Name is required".to_string()))?;

        let created = material::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            name: Set(name),
            color: Set(non_blank(request.color)),
            size: Set(non_blank(request.size)),
            quantity: Set(request.quantity.unwrap_or(0)),
            pack_size: Set(request.pack_size.unwrap_or(self.default_pack_size)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create material");
            ServiceError::DatabaseError(e)
        })?;

        info!(material_id = %created.id, quantity = created.quantity, "Material created");
        Ok(created)
    }

    /// Applies a signed stock change, flooring the result at zero.
    #[instrument(skip(self))]
    pub async fn adjust_quantity(
        &self,
        user_id: Uuid,
        material_id: Uuid,
        delta: i32,
    ) -> Result<MaterialModel, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let current = MaterialEntity::find_by_id(material_id)
            .filter(material::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Material not found".to_string()))?;

        let new_quantity = apply_delta(current.quantity, delta);
        let mut active: material::ActiveModel = current.into();
        active.quantity = Set(new_quantity);
        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, material_id = %material_id, "Failed to adjust material quantity");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await?;

        info!(material_id = %material_id, delta, quantity = updated.quantity, "Material quantity adjusted");
        Ok(updated)
    }

    /// Every material with aggregate demand from the caller's open orders.
    #[instrument(skip(self))]
    pub async fn requirements(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<MaterialRequirementView>, ServiceError> {
        let materials = self.list_materials(user_id).await?;

        let open_items = order_item::Entity::find()
            .find_also_related(order::Entity)
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::Status.is_in([OrderStatus::Pending, OrderStatus::InProgress]))
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load open order items");
                ServiceError::DatabaseError(e)
            })?;

        let mut lines = Vec::with_capacity(open_items.len());
        let mut contributors: HashMap<Uuid, Vec<OpenOrderDemand>> = HashMap::new();
        for (item, parent) in open_items {
            let Some(parent) = parent else { continue };
            lines.push(DemandLine {
                material_id: item.material_id,
                order_status: parent.status,
                quantity_needed: item.quantity_needed,
            });
            contributors
                .entry(item.material_id)
                .or_default()
                .push(OpenOrderDemand {
                    order_id: parent.id,
                    name: parent.name,
                    status: parent.status,
                    due_date: parent.due_date,
                    quantity_needed: item.quantity_needed,
                });
        }

        let mut requirements = availability::aggregate_requirements(
            materials.iter().map(|m| (m.id, m.quantity)),
            &lines,
        );

        Ok(materials
            .into_iter()
            .filter_map(|material| {
                let requirement = requirements.remove(&material.id)?;
                let open_orders = contributors.remove(&material.id).unwrap_or_default();
                Some(MaterialRequirementView {
                    material,
                    requirement,
                    open_orders,
                })
            })
            .collect())
    }
}

fn apply_delta(quantity: i32, delta: i32) -> i32 {
    let next = i64::from(quantity) + i64::from(delta);
    next.clamp(0, i64::from(i32::MAX)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_is_floored_at_zero() {
        assert_eq!(apply_delta(10, -3), 7);
        assert_eq!(apply_delta(2, -5), 0);
        assert_eq!(apply_delta(0, 24), 24);
        assert_eq!(apply_delta(i32::MAX, 1), i32::MAX);
        assert_eq!(apply_delta(0, i32::MIN), 0);
    }
}
