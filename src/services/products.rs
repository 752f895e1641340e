use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rust_decimal::Decimal;
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
        design::{self, Model as DesignModel},
        material::{self, Model as MaterialModel},
        product::{self, Entity as ProductEntity, Model as ProductModel},
        product_design::{self, Model as ProductDesignModel},
        product_material::{self, Model as ProductMaterialModel},
    },
    errors::ServiceError,
    services::{
        availability::{self, Buildability, ComponentStock},
        non_blank,
        orders::{self, NewOrder, OrderView},
        parse_due_date, present, validate_priority,
    },
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductMaterialInput {
    pub material_id: Uuid,
    #[validate(range(min = 1, message = "Quantity required must be at least 1"))]
    pub quantity_required: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProductDesignInput {
    pub design_id: Uuid,
    pub placement: Option<String>,
    pub size_info: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[validate(length(max = 64))]
    pub sku: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[serde(default)]
    pub materials: Vec<ProductMaterialInput>,
    #[serde(default)]
    pub designs: Vec<ProductDesignInput>,
}

/// Partial update of a product's descriptive fields. `null` clears.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "present")]
    #[validate(length(max = 64))]
    #[schema(value_type = Option<String>)]
    pub sku: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[validate(length(max = 100))]
    #[schema(value_type = Option<String>)]
    pub category: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderFromProductRequest {
    #[validate(range(min = 1, message = "Quantity must be greater than 0"))]
    pub quantity: i32,
    pub order_name: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductMaterialView {
    #[serde(flatten)]
    pub line: ProductMaterialModel,
    pub material: Option<MaterialModel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductDesignView {
    #[serde(flatten)]
    pub link: ProductDesignModel,
    pub design: Option<DesignModel>,
}

/// A product with its bill of materials, designs and current buildability
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: ProductModel,
    pub product_materials: Vec<ProductMaterialView>,
    pub product_designs: Vec<ProductDesignView>,
    #[serde(flatten)]
    pub buildability: Buildability,
}

/// Category (uncategorized last), then name, then id.
fn catalog_order(a: &ProductModel, b: &ProductModel) -> Ordering {
    match (&a.category, &b.category) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
    .then_with(|| a.id.cmp(&b.id))
}

async fn ensure_designs_owned<C>(
    db: &C,
    user_id: Uuid,
    design_ids: impl IntoIterator<Item = Uuid>,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
{
    let ids: HashSet<Uuid> = design_ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(());
    }

    let found = design::Entity::find()
        .filter(design::Column::UserId.eq(user_id))
        .filter(design::Column::Id.is_in(ids.iter().copied()))
        .count(db)
        .await?;

    if found != ids.len() as u64 {
        warn!(%user_id, requested = ids.len(), found, "Product references unknown designs");
        return Err(ServiceError::InvalidInput(
            "One or more designs not found".to_string(),
        ));
    }
    Ok(())
}

/// Service for the product catalog
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Active products with buildability
    #[instrument(skip(self))]
    pub async fn list_products(&self, user_id: Uuid) -> Result<Vec<ProductView>, ServiceError> {
        let mut products = ProductEntity::find()
            .filter(product::Column::UserId.eq(user_id))
            .filter(product::Column::IsActive.eq(true))
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list products");
                ServiceError::DatabaseError(e)
            })?;
        products.sort_by(catalog_order);

        self.load_views(&*self.db_pool, products).await
    }

    pub async fn get_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductView, ServiceError> {
        let product = self.find_owned(&*self.db_pool, user_id, product_id).await?;
        self.single_view(&*self.db_pool, product).await
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        user_id: Uuid,
        request: CreateProductRequest,
    ) -> Result<ProductView, ServiceError> {
        request.validate()?;
        for line in &request.materials {
            line.validate()?;
        }
        let name = non_blank(Some(request.name))
            .ok_or_else(|| ServiceError::ValidationError("Name is required".to_string()))?;

        let mut seen = HashSet::new();
        if !request.materials.iter().all(|m| seen.insert(m.material_id)) {
            return Err(ServiceError::InvalidInput(
                "A material may appear only once per product".to_string(),
            ));
        }

        let txn = self.db_pool.begin().await?;
        orders::ensure_materials_owned(&txn, user_id, request.materials.iter().map(|m| m.material_id))
            .await?;
        ensure_designs_owned(&txn, user_id, request.designs.iter().map(|d| d.design_id)).await?;

        let created = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            name: Set(name),
            description: Set(non_blank(request.description)),
            price: Set(request.price),
            sku: Set(non_blank(request.sku)),
            category: Set(non_blank(request.category)),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create product");
            ServiceError::DatabaseError(e)
        })?;

        for line in request.materials {
            product_material::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(created.id),
                material_id: Set(line.material_id),
                quantity_required: Set(line.quantity_required),
                notes: Set(non_blank(line.notes)),
            }
            .insert(&txn)
            .await?;
        }

        for link in request.designs {
            product_design::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(created.id),
                design_id: Set(link.design_id),
                placement: Set(non_blank(link.placement)),
                size_info: Set(non_blank(link.size_info)),
                notes: Set(non_blank(link.notes)),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %created.id, "Failed to link design");
                ServiceError::DatabaseError(e)
            })?;
        }

        let view = self.single_view(&txn, created).await?;
        txn.commit().await?;

        info!(
            product_id = %view.product.id,
            materials = view.product_materials.len(),
            designs = view.product_designs.len(),
            "Product created"
        );
        Ok(view)
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductView, ServiceError> {
        request.validate()?;
        let name = match request.name {
            Some(raw) => Some(non_blank(Some(raw)).ok_or_else(|| {
                ServiceError::ValidationError("Name cannot be empty".to_string())
            })?),
            None => None,
        };

        let txn = self.db_pool.begin().await?;
        let current = self.find_owned(&txn, user_id, product_id).await?;

        let mut active: product::ActiveModel = current.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(non_blank(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(sku) = request.sku {
            active.sku = Set(non_blank(sku));
        }
        if let Some(category) = request.category {
            active.category = Set(non_blank(category));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(&txn).await.map_err(|e| {
            error!(error = %e, %product_id, "Failed to update product");
            ServiceError::DatabaseError(e)
        })?;
        let view = self.single_view(&txn, updated).await?;
        txn.commit().await?;

        info!(%product_id, "Product updated");
        Ok(view)
    }

    /// Opens a PENDING order needing `quantity_required * quantity` of each
    /// bill-of-materials line.
    #[instrument(skip(self, request), fields(quantity = request.quantity))]
    pub async fn create_order_from_product(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        request: CreateOrderFromProductRequest,
    ) -> Result<OrderView, ServiceError> {
        request.validate()?;
        validate_priority(request.priority)?;
        let due_date = request
            .due_date
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_due_date)
            .transpose()?;

        let txn = self.db_pool.begin().await?;
        let product = self.find_owned(&txn, user_id, product_id).await?;
        let lines = product_material::Entity::find()
            .filter(product_material::Column::ProductId.eq(product.id))
            .all(&txn)
            .await?;

        if lines.is_empty() {
            return Err(ServiceError::BadRequest(
                "Product has no materials defined".to_string(),
            ));
        }

        let items = lines
            .iter()
            .map(|line| {
                line.quantity_required
                    .checked_mul(request.quantity)
                    .map(|needed| (line.material_id, needed))
                    .ok_or_else(|| {
                        ServiceError::InvalidInput("Requested quantity is too large".to_string())
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let name = non_blank(request.order_name)
            .unwrap_or_else(|| format!("{} ({} units)", product.name, request.quantity));

        let order = orders::insert_order(
            &txn,
            user_id,
            NewOrder {
                name,
                due_date,
                priority: request.priority.unwrap_or(0),
                items,
            },
        )
        .await?;
        let view = orders::load_order_views(&txn, vec![order])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Order vanished while loading".to_string()))?;
        txn.commit().await?;

        info!(%product_id, order_id = %view.order.id, "Order created from product");
        Ok(view)
    }

    async fn find_owned<C>(
        &self,
        db: &C,
        user_id: Uuid,
        product_id: Uuid,
    ) -> Result<ProductModel, ServiceError>
    where
        C: ConnectionTrait,
    {
        ProductEntity::find_by_id(product_id)
            .filter(product::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))
    }

    async fn single_view<C>(&self, db: &C, product: ProductModel) -> Result<ProductView, ServiceError>
    where
        C: ConnectionTrait,
    {
        self.load_views(db, vec![product])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::InternalError("Product vanished while loading".to_string()))
    }

    async fn load_views<C>(
        &self,
        db: &C,
        products: Vec<ProductModel>,
    ) -> Result<Vec<ProductView>, ServiceError>
    where
        C: ConnectionTrait,
    {
        if products.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();

        let material_rows = product_material::Entity::find()
            .filter(product_material::Column::ProductId.is_in(ids.clone()))
            .find_also_related(material::Entity)
            .all(db)
            .await?;
        let design_rows = product_design::Entity::find()
            .filter(product_design::Column::ProductId.is_in(ids))
            .find_also_related(design::Entity)
            .all(db)
            .await?;

        let mut materials_by_product: HashMap<Uuid, Vec<ProductMaterialView>> = HashMap::new();
        for (line, material) in material_rows {
            materials_by_product
                .entry(line.product_id)
                .or_default()
                .push(ProductMaterialView { line, material });
        }
        let mut designs_by_product: HashMap<Uuid, Vec<ProductDesignView>> = HashMap::new();
        for (link, design) in design_rows {
            designs_by_product
                .entry(link.product_id)
                .or_default()
                .push(ProductDesignView { link, design });
        }

        Ok(products
            .into_iter()
            .map(|product| {
                let product_materials = materials_by_product.remove(&product.id).unwrap_or_default();
                let product_designs = designs_by_product.remove(&product.id).unwrap_or_default();
                let buildability = availability::buildability(product_materials.iter().map(|pm| {
                    ComponentStock {
                        quantity_required: pm.line.quantity_required,
                        on_hand: pm.material.as_ref().map_or(0, |m| m.quantity),
                    }
                }));
                ProductView {
                    product,
                    product_materials,
                    product_designs,
                    buildability,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(name: &str, category: Option<&str>) -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_string(),
            description: None,
            price: None,
            sku: None,
            category: category.map(str::to_string),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn catalog_sorts_by_category_then_name_with_uncategorized_last() {
        let mut products = vec![
            product("Zip hoodie", None),
            product("Tote", Some("Bags")),
            product("Crew tee", Some("Shirts")),
            product("Baby tee", Some("Shirts")),
        ];
        products.sort_by(catalog_order);
        let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Tote", "Baby tee", "Crew tee", "Zip hoodie"]);
    }

    #[test]
    fn price_accepts_numbers_and_strings() {
        let request: CreateProductRequest =
            serde_json::from_str(r#"{"name":"Tee","price":19.99}"#).unwrap();
        assert_eq!(request.price, Some(Decimal::new(1999, 2)));
        assert!(request.materials.is_empty());

        let request: CreateProductRequest =
            serde_json::from_str(r#"{"name":"Tee","price":"24.50"}"#).unwrap();
        assert_eq!(request.price, Some(Decimal::new(2450, 2)));
    }

    #[test]
    fn update_applies_the_same_length_limits_as_create() {
        let request: UpdateProductRequest =
            serde_json::from_str(r#"{"sku":null,"category":"Tees"}"#).unwrap();
        assert!(request.validate().is_ok());

        let long_sku = UpdateProductRequest {
            sku: Some(Some("S".repeat(65))),
            ..Default::default()
        };
        assert!(long_sku.validate().is_err());

        let long_name = UpdateProductRequest {
            name: Some("n".repeat(201)),
            ..Default::default()
        };
        assert!(long_name.validate().is_err());
    }

    #[test]
    fn order_from_product_rejects_zero_quantity() {
        let request = CreateOrderFromProductRequest {
            quantity: 0,
            order_name: None,
            due_date: None,
            priority: None,
        };
        assert!(request.validate().is_err());
    }
}
