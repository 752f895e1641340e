use axum::{extract::State, http::StatusCode, response::Json};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::designs::{CreateDesignRequest, DesignView},
    ApiResponse, AppState,
};

#[utoipa::path(
    get,
    path = "/api/v1/designs",
    summary = "List designs",
    description = "Active designs by name with the products that use them",
    responses(
        (status = 200, description = "Designs retrieved", body = ApiResponse<Vec<DesignView>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Designs"
)]
pub async fn list_designs(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<DesignView>>>, ServiceError> {
    let designs = state.services.designs.list_designs(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(designs)))
}

#[utoipa::path(
    post,
    path = "/api/v1/designs",
    summary = "Register design",
    description = "Records artwork metadata; the file itself is stored elsewhere",
    request_body = CreateDesignRequest,
    responses(
        (status = 201, description = "Design registered", body = ApiResponse<DesignView>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Designs"
)]
pub async fn create_design(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateDesignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DesignView>>), ServiceError> {
    let design = state
        .services
        .designs
        .create_design(auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(design))))
}
