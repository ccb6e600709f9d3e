use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::auth::{AdminUser, AuthUser};
use crate::entities::order::OrderStatus;
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response, PaginationParams};
use crate::services::orders::{PlaceOrderRequest, UpdateOrderStatusRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(my_orders).post(place_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel-request", patch(request_cancel))
        .route("/admin/orders", get(admin_list_orders))
        .route("/admin/orders/stats", get(admin_order_stats))
        .route("/admin/orders/:id/status", patch(admin_update_status))
}

/// Places an order for the authenticated customer.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 201, description = "Order placed"),
        (status = 400, description = "Invalid request or coupon", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<Response, ApiError> {
    let placed = state.services.orders.place_order(user.user_id, request).await?;
    Ok(created_response(placed))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Caller's orders returned"),
    ),
    tag = "orders"
)]
pub async fn my_orders(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let orders = state.services.orders.my_orders(user.user_id).await?;
    Ok(success_response(orders))
}

#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    responses(
        (status = 200, description = "Order returned"),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let order = state
        .services
        .orders
        .get_order(id, user.user_id, user.is_admin())
        .await?;
    Ok(success_response(order))
}

/// Flags the order for cancellation within the post-purchase window.
#[utoipa::path(
    patch,
    path = "/api/v1/orders/{id}/cancel-request",
    responses(
        (status = 200, description = "Cancellation requested"),
        (status = 409, description = "Window passed or order already in fulfilment", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn request_cancel(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let order = state.services.orders.request_cancel(id, user.user_id).await?;
    Ok(success_response(order))
}

#[derive(Debug, Deserialize, IntoParams)]
struct OrderListFilter {
    status: Option<OrderStatus>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    params(PaginationParams, OrderListFilter),
    responses(
        (status = 200, description = "Order list returned"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn admin_list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
    Query(filter): Query<OrderListFilter>,
) -> Result<Response, ApiError> {
    let list = state
        .services
        .orders
        .list_orders(pagination.page, pagination.per_page, filter.status)
        .await?;
    Ok(success_response(list))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/orders/stats",
    responses(
        (status = 200, description = "Order statistics returned"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn admin_order_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Response, ApiError> {
    let stats = state.services.orders.stats().await?;
    Ok(success_response(stats))
}

#[utoipa::path(
    patch,
    path = "/api/v1/admin/orders/{id}/status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 409, description = "Order in terminal state", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn admin_update_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Response, ApiError> {
    let order = state.services.orders.update_status(id, request.status).await?;
    Ok(success_response(order))
}
