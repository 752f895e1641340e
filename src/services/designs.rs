use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        design::{self, Entity as DesignEntity, Model as DesignModel},
        product, product_design,
    },
    errors::ServiceError,
    services::non_blank,
};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateDesignRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 255, message = "File name is required"))]
    pub file_name: String,
    #[validate(range(min = 0))]
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    /// Comma separated
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedProduct {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DesignView {
    #[serde(flatten)]
    pub design: DesignModel,
    pub products: Vec<LinkedProduct>,
}

/// Service for design artwork metadata
#[derive(Clone)]
pub struct DesignService {
    db_pool: Arc<DbPool>,
}

impl DesignService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Active designs ordered by name, each with the products using it
    #[instrument(skip(self))]
    pub async fn list_designs(&self, user_id: Uuid) -> Result<Vec<DesignView>, ServiceError> {
        let designs = DesignEntity::find()
            .filter(design::Column::UserId.eq(user_id))
            .filter(design::Column::IsActive.eq(true))
            .order_by_asc(design::Column::Name)
            .order_by_asc(design::Column::Id)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list designs");
                ServiceError::DatabaseError(e)
            })?;
        if designs.is_empty() {
            return Ok(Vec::new());
        }

        let links = product_design::Entity::find()
            .filter(product_design::Column::DesignId.is_in(designs.iter().map(|d| d.id)))
            .find_also_related(product::Entity)
            .all(&*self.db_pool)
            .await?;

        let mut by_design: HashMap<Uuid, Vec<LinkedProduct>> = HashMap::new();
        for (link, linked) in links {
            let Some(linked) = linked else { continue };
            let products = by_design.entry(link.design_id).or_default();
            // One product may place the same design more than once.
            if !products.iter().any(|p| p.id == linked.id) {
                products.push(LinkedProduct {
                    id: linked.id,
                    name: linked.name,
                });
            }
        }

        Ok(designs
            .into_iter()
            .map(|design| {
                let mut products = by_design.remove(&design.id).unwrap_or_default();
                products.sort_by(|a, b| a.name.cmp(&b.name));
                DesignView { design, products }
            })
            .collect())
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_design(
        &self,
        user_id: Uuid,
        request: CreateDesignRequest,
    ) -> Result<DesignView, ServiceError> {
        request.validate()?;
        let name = non_blank(Some(request.name))
            .ok_or_else(|| ServiceError::ValidationError("Name is required".to_string()))?;
        let file_name = sanitize_file_name(&request.file_name)
            .ok_or_else(|| ServiceError::ValidationError("File name is required".to_string()))?;
        let file_url = format!(
            "/uploads/designs/{}-{}",
            Utc::now().timestamp_millis(),
            file_name
        );

        let created = design::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            name: Set(name),
            description: Set(non_blank(request.description)),
            file_url: Set(file_url),
            file_name: Set(file_name),
            file_size: Set(request.file_size.unwrap_or(0)),
            mime_type: Set(non_blank(request.mime_type)
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())),
            tags: Set(tags_json(request.tags.as_deref())?),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create design");
            ServiceError::DatabaseError(e)
        })?;

        info!(design_id = %created.id, file_url = %created.file_url, "Design created");
        Ok(DesignView {
            design: created,
            products: Vec::new(),
        })
    }
}

/// Keeps the final path segment and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next()?.trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}

/// `"a, b,,c"` becomes `["a","b","c"]`; no tags becomes `None`.
fn tags_json(raw: Option<&str>) -> Result<Option<String>, ServiceError> {
    let tags: Vec<&str> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if tags.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(&tags)
        .map(Some)
        .map_err(|e| ServiceError::InternalError(format!("Failed to encode tags: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Some("retro, summer ,,  logo"), Some(r#"["retro","summer","logo"]"#))]
    #[case(Some(" , "), None)]
    #[case(None, None)]
    fn tags_become_a_json_array(#[case] raw: Option<&str>, #[case] expected: Option<&str>) {
        assert_eq!(tags_json(raw).unwrap().as_deref(), expected);
    }

    #[rstest]
    #[case("sunset.png", Some("sunset.png"))]
    #[case("../../etc/passwd", Some("passwd"))]
    #[case("C:\\art\\big logo.svg", Some("big_logo.svg"))]
    #[case("..", None)]
    #[case("   ", None)]
    fn file_names_are_reduced_to_a_safe_segment(
        #[case] raw: &str,
        #[case] expected: Option<&str>,
    ) {
        assert_eq!(sanitize_file_name(raw).as_deref(), expected);
    }
}
