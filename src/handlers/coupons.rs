use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::services::coupons::{CreateTemplateRequest, RedeemCouponRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons", get(my_coupons))
        .route("/coupons/validate", post(validate_coupon))
        .route("/coupons/redeem", post(redeem_coupon))
        .route("/coupon-templates", get(list_templates).post(create_template))
        .route(
            "/coupon-templates/:id",
            axum::routing::delete(delete_template),
        )
        .route("/coupon-templates/:id/redeem", post(redeem_template))
}

/// Caller's coupon wallet, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/coupons",
    responses(
        (status = 200, description = "Wallet returned"),
    ),
    tag = "coupons"
)]
pub async fn my_coupons(State(state): State<AppState>, user: AuthUser) -> Result<Response, ApiError> {
    let coupons = state.services.coupons.list_my_coupons(user.user_id).await?;
    Ok(success_response(coupons))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub subtotal: i64,
}

/// Dry-run of a coupon against a subtotal; consumes nothing.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Discount preview returned"),
        (status = 400, description = "Coupon not applicable", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Response, ApiError> {
    let preview = state
        .services
        .coupons
        .preview(user.user_id, &request.code, request.subtotal)
        .await?;
    Ok(success_response(preview))
}

/// Spends points to mint a one-shot coupon from caller-supplied terms.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/redeem",
    request_body = RedeemCouponRequest,
    responses(
        (status = 201, description = "Coupon minted"),
        (status = 400, description = "Invalid terms or insufficient points", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn redeem_coupon(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<RedeemCouponRequest>,
) -> Result<Response, ApiError> {
    let coupon = state
        .services
        .coupons
        .redeem_ad_hoc(user.user_id, request)
        .await?;
    Ok(created_response(coupon))
}

#[utoipa::path(
    get,
    path = "/api/v1/coupon-templates",
    responses(
        (status = 200, description = "Redeemable templates returned"),
    ),
    tag = "coupons"
)]
pub async fn list_templates(State(state): State<AppState>) -> Result<Response, ApiError> {
    let templates = state.services.coupons.list_templates().await?;
    Ok(success_response(templates))
}

/// Spends points to mint a coupon from a template.
#[utoipa::path(
    post,
    path = "/api/v1/coupon-templates/{id}/redeem",
    responses(
        (status = 201, description = "Coupon minted"),
        (status = 400, description = "Insufficient points", body = crate::errors::ErrorResponse),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn redeem_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let coupon = state
        .services
        .coupons
        .redeem_from_template(user.user_id, id)
        .await?;
    Ok(created_response(coupon))
}

#[utoipa::path(
    post,
    path = "/api/v1/coupon-templates",
    request_body = CreateTemplateRequest,
    responses(
        (status = 201, description = "Template created"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn create_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<Response, ApiError> {
    let template = state.services.coupons.create_template(request).await?;
    Ok(created_response(template))
}

#[utoipa::path(
    delete,
    path = "/api/v1/coupon-templates/{id}",
    responses(
        (status = 204, description = "Template deleted"),
        (status = 404, description = "Template not found", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn delete_template(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    state.services.coupons.delete_template(id).await?;
    Ok(no_content_response())
}
