use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};

use crate::auth::AdminUser;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, no_content_response, success_response, PaginationParams};
use crate::services::catalog::{CreateProductRequest, UpdateProductRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/best-sellers", get(best_sellers))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/reviews", get(product_reviews))
}

/// Public catalog listing.
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Product list returned"),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, ApiError> {
    let list = state
        .services
        .catalog
        .list_products(pagination.page, pagination.per_page)
        .await?;
    Ok(success_response(list))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/best-sellers",
    responses(
        (status = 200, description = "Top selling products returned"),
    ),
    tag = "products"
)]
pub async fn best_sellers(State(state): State<AppState>) -> Result<Response, ApiError> {
    let products = state.services.catalog.best_sellers(10).await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    responses(
        (status = 200, description = "Product returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/reviews",
    responses(
        (status = 200, description = "Approved reviews returned"),
    ),
    tag = "reviews"
)]
pub async fn product_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let reviews = state.services.reviews.product_reviews(id).await?;
    Ok(success_response(reviews))
}

/// Admin: add a product to the catalog.
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateProductRequest>,
) -> Result<Response, ApiError> {
    let product = state.services.catalog.create_product(request).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<Response, ApiError> {
    let product = state.services.catalog.update_product(id, request).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.services.catalog.delete_product(id).await?;
    Ok(no_content_response())
}
