use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::review::{self, Entity as ReviewEntity, ReviewStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::promotion_ledger;

/// Flat loyalty bonus for a verified-purchase review.
const REVIEW_BONUS_POINTS: i64 = 10;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReviewRequest {
    pub product_id: i64,
    pub order_id: i64,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(min = 1, message = "Review content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ModerateReviewRequest {
    pub status: ReviewStatus,
}

#[derive(Debug, Serialize)]
pub struct ProductReviewsResponse {
    pub reviews: Vec<review::Model>,
    pub total: u64,
    /// Mean rating over approved reviews, 0.0 when there are none
    pub average_rating: f64,
}

/// Product reviews with verified-purchase gating.
#[derive(Clone)]
pub struct ReviewService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReviewService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Submits a review against a completed order containing the product.
    /// Verified reviews are auto-approved and award the flat point bonus;
    /// the review insert and the bonus credit commit together.
    #[instrument(skip(self, request), fields(user_id = user_id, product_id = request.product_id))]
    pub async fn create_review(
        &self,
        user_id: i64,
        request: CreateReviewRequest,
    ) -> Result<review::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let found_order = OrderEntity::find_by_id(request.order_id)
            .filter(order::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if found_order.status != OrderStatus::Completed {
            return Err(ServiceError::ValidationError(
                "Only completed orders can be reviewed".to_string(),
            ));
        }
        if !found_order
            .items
            .0
            .iter()
            .any(|i| i.product_id == request.product_id)
        {
            return Err(ServiceError::ValidationError(
                "Product is not part of this order".to_string(),
            ));
        }

        let duplicate = ReviewEntity::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::ProductId.eq(request.product_id))
            .filter(review::Column::OrderId.eq(request.order_id))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::ValidationError(
                "Product already reviewed for this order".to_string(),
            ));
        }

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start review transaction");
            ServiceError::DatabaseError(e)
        })?;

        let created = review::ActiveModel {
            user_id: Set(user_id),
            product_id: Set(request.product_id),
            order_id: Set(request.order_id),
            rating: Set(request.rating),
            content: Set(request.content),
            is_verified: Set(true),
            status: Set(ReviewStatus::Approved),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        promotion_ledger::apply_delta(&txn, user_id, REVIEW_BONUS_POINTS).await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit review transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(review_id = created.id, "Review submitted");
        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::ReviewSubmitted {
                    review_id: created.id,
                    product_id: created.product_id,
                    user_id,
                })
                .await;
        }

        Ok(created)
    }

    /// Approved reviews for a product's public page, newest first, with the
    /// aggregate rating.
    #[instrument(skip(self))]
    pub async fn product_reviews(
        &self,
        product_id: i64,
    ) -> Result<ProductReviewsResponse, ServiceError> {
        let db = &*self.db_pool;
        let reviews = ReviewEntity::find()
            .filter(review::Column::ProductId.eq(product_id))
            .filter(review::Column::Status.eq(ReviewStatus::Approved))
            .order_by_desc(review::Column::CreatedAt)
            .all(db)
            .await?;

        let total = reviews.len() as u64;
        let average_rating = if reviews.is_empty() {
            0.0
        } else {
            reviews.iter().map(|r| r.rating as f64).sum::<f64>() / total as f64
        };

        Ok(ProductReviewsResponse {
            reviews,
            total,
            average_rating,
        })
    }

    /// Admin moderation: flip a review's status.
    #[instrument(skip(self))]
    pub async fn moderate(
        &self,
        review_id: i64,
        request: ModerateReviewRequest,
    ) -> Result<review::Model, ServiceError> {
        let db = &*self.db_pool;
        let found = ReviewEntity::find_by_id(review_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Review not found".to_string()))?;

        let mut active: review::ActiveModel = found.into();
        active.status = Set(request.status);
        let updated = active.update(db).await?;

        info!(review_id = updated.id, "Review moderated");
        Ok(updated)
    }
}
