use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    services::{
        orders::OrderView,
        products::{
            CreateOrderFromProductRequest, CreateProductRequest, ProductView,
            UpdateProductRequest,
        },
    },
    ApiResponse, AppState,
};

/// List products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    summary = "List products",
    description = "Active products by category then name, with how many units current stock can build",
    responses(
        (status = 200, description = "Products retrieved", body = ApiResponse<Vec<ProductView>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<ProductView>>>, ServiceError> {
    let products = state.services.products.list_products(auth_user.user_id).await?;
    Ok(Json(ApiResponse::success(products)))
}

/// Get product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    summary = "Get product",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product retrieved", body = ApiResponse<ProductView>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<ProductView>>, ServiceError> {
    let product = state
        .services
        .products
        .get_product(auth_user.user_id, id)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Create product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create product",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ApiResponse<ProductView>),
        (status = 400, description = "Invalid request data or unknown materials/designs", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductView>>), ServiceError> {
    let product = state
        .services
        .products
        .create_product(auth_user.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// Update product
#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}",
    summary = "Update product",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ApiResponse<ProductView>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductView>>, ServiceError> {
    let product = state
        .services
        .products
        .update_product(auth_user.user_id, id, request)
        .await?;
    Ok(Json(ApiResponse::success(product)))
}

/// Order a product
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/order",
    summary = "Create order from product",
    description = "Opens an order needing each bill-of-materials line times the requested quantity",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = CreateOrderFromProductRequest,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<OrderView>),
        (status = 400, description = "Invalid quantity or product without materials", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    security(("Bearer" = [])),
    tag = "Products"
)]
pub async fn create_order_from_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderFromProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderView>>), ServiceError> {
    let order = state
        .services
        .products
        .create_order_from_product(auth_user.user_id, id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}
