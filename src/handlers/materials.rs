use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::material::Model as MaterialModel,
    errors::ServiceError,
    services::materials::{AdjustQuantityRequest, CreateMaterialRequest, MaterialRequirementView},
    ApiResponse, AppState,
};

/// List materials
#[utoipa::path(
    get,
    path = "/api/v1/materials",
    summary = "List materials",
    description = "All materials of the caller ordered by name, color and size",
    responses(
        (status = 200, description = "Materials retrieved", body = ApiResponse<Vec<MaterialModel>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<MaterialModel>>>, ServiceError> {
    let materials = state
        .services
        .materials
        .list_materials(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(materials)))
}

/// Create material
#[utoipa::path(
    post,
    path = "/api/v1/materials",
    summary = "Create material",
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Material created", body = ApiResponse<MaterialModel>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MaterialModel>>), ServiceError> {
    let created = state
        .services
        .materials
        .create_material(auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(created))))
}

/// Adjust stock
#[utoipa::path(
    patch,
    path = "/api/v1/materials/{id}",
    summary = "Adjust material quantity",
    description = "Adds a signed delta to the on-hand quantity, flooring the result at zero",
    params(("id" = Uuid, Path, description = "Material ID")),
    request_body = AdjustQuantityRequest,
    responses(
        (status = 200, description = "Quantity adjusted", body = ApiResponse<MaterialModel>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn adjust_material_quantity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<AdjustQuantityRequest>,
) -> Result<Json<ApiResponse<MaterialModel>>, ServiceError> {
    let updated = state
        .services
        .materials
        .adjust_quantity(auth_user.user_id, id, request.delta)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

/// Material requirements
#[utoipa::path(
    get,
    path = "/api/v1/materials/requirements",
    summary = "Material requirements",
    description = "Per material: units needed by open orders, sufficiency and shortage, with the contributing orders",
    responses(
        (status = 200, description = "Requirements computed", body = ApiResponse<Vec<MaterialRequirementView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Materials"
)]
pub async fn material_requirements(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<MaterialRequirementView>>>, ServiceError> {
    let requirements = state
        .services
        .materials
        .requirements(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(requirements)))
}
