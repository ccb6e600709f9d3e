use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::success_response;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/promotions/balance", get(my_balance))
        .route("/admin/promotions/adjust", post(admin_adjust))
}

/// Caller's loyalty point balance.
#[utoipa::path(
    get,
    path = "/api/v1/promotions/balance",
    responses(
        (status = 200, description = "Point balance returned"),
    ),
    tag = "promotions"
)]
pub async fn my_balance(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let balance = state.services.promotions.get_balance(user.user_id).await?;
    Ok(success_response(balance))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustPointsRequest {
    pub user_id: i64,
    /// Positive credits, negative debits; the balance never drops below zero
    pub delta: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/promotions/adjust",
    request_body = AdjustPointsRequest,
    responses(
        (status = 200, description = "Balance adjusted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "promotions"
)]
pub async fn admin_adjust(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<AdjustPointsRequest>,
) -> Result<Response, ApiError> {
    let balance = state
        .services
        .promotions
        .adjust(request.user_id, request.delta)
        .await?;
    Ok(success_response(balance))
}
