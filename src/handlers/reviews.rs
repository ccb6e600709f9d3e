use axum::{
    extract::{Path, State},
    response::Response,
    routing::{post, put},
    Json, Router,
};

use crate::auth::{AdminUser, AuthUser};
use crate::errors::ApiError;
use crate::handlers::common::{created_response, success_response};
use crate::services::reviews::{CreateReviewRequest, ModerateReviewRequest};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(create_review))
        .route("/admin/reviews/:id", put(moderate_review))
}

/// Submits a verified-purchase review and credits the review bonus.
#[utoipa::path(
    post,
    path = "/api/v1/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review submitted"),
        (status = 400, description = "Order not completed or product not on it", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<CreateReviewRequest>,
) -> Result<Response, ApiError> {
    let review = state
        .services
        .reviews
        .create_review(user.user_id, request)
        .await?;
    Ok(created_response(review))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/reviews/{id}",
    request_body = ModerateReviewRequest,
    responses(
        (status = 200, description = "Review status updated"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Review not found", body = crate::errors::ErrorResponse),
    ),
    tag = "reviews"
)]
pub async fn moderate_review(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<ModerateReviewRequest>,
) -> Result<Response, ApiError> {
    let review = state.services.reviews.moderate(id, request).await?;
    Ok(success_response(review))
}
