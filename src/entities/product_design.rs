use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "product_designs")]
#[serde(rename_all = "camelCase")]
#[schema(as = ProductDesign)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub design_id: Uuid,
    /// e.g. "front", "back", "left sleeve"
    pub placement: Option<String>,
    pub size_info: Option<String>,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::design::Entity",
        from = "Column::DesignId",
        to = "super::design::Column::Id"
    )]
    Design,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::design::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Design.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
