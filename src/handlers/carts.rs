use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};

use crate::auth::AuthUser;
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::services::carts::{AddCartItemRequest, UpdateCartItemRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route(
            "/cart/items/:product_id",
            put(update_item).delete(remove_item),
        )
}

#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart returned"),
    ),
    tag = "cart"
)]
pub async fn get_cart(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let cart = state.services.carts.get_cart(user.user_id).await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    post,
    path = "/api/v1/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Item added, cart returned"),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Response, ApiError> {
    let cart = state.services.carts.add_item(user.user_id, request).await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    put,
    path = "/api/v1/cart/items/{product_id}",
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated, cart returned"),
        (status = 404, description = "Item not in cart", body = crate::errors::ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i64>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .update_item(user.user_id, product_id, request)
        .await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{product_id}",
    responses(
        (status = 200, description = "Item removed, cart returned"),
        (status = 404, description = "Item not in cart", body = crate::errors::ErrorResponse),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<i64>,
) -> Result<Response, ApiError> {
    let cart = state
        .services
        .carts
        .remove_item(user.user_id, product_id)
        .await?;
    Ok(success_response(cart))
}

#[utoipa::path(
    delete,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart emptied"),
    ),
    tag = "cart"
)]
pub async fn clear_cart(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let cart = state.services.carts.clear_cart(user.user_id).await?;
    Ok(success_response(cart))
}
