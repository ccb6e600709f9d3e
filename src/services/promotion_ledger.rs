use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use serde::Serialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::promotion_balance::{self, Entity as BalanceEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub total_points: i64,
}

impl From<promotion_balance::Model> for BalanceResponse {
    fn from(model: promotion_balance::Model) -> Self {
        Self {
            user_id: model.user_id,
            total_points: model.total_points,
        }
    }
}

/// Loads a user's balance row, creating a zero-point row on first touch.
/// Callable inside a surrounding transaction.
pub async fn load_or_create_balance<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<promotion_balance::Model, ServiceError> {
    if let Some(found) = BalanceEntity::find()
        .filter(promotion_balance::Column::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(found);
    }

    let now = Utc::now();
    let created = promotion_balance::ActiveModel {
        user_id: Set(user_id),
        total_points: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;

    Ok(created)
}

/// Applies `delta` to the balance and clamps the result at zero. All point
/// mutations go through here so the non-negative invariant holds everywhere.
pub async fn apply_delta<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    delta: i64,
) -> Result<promotion_balance::Model, ServiceError> {
    let balance = load_or_create_balance(conn, user_id).await?;
    let next = (balance.total_points + delta).max(0);

    let mut active: promotion_balance::ActiveModel = balance.into();
    active.total_points = Set(next);
    active.updated_at = Set(Utc::now());
    let updated = active.update(conn).await?;

    Ok(updated)
}

/// Debits exactly `points` or fails; used when minting coupons, where the
/// cost must be fully covered rather than clamped.
pub async fn debit_exact<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    points: i64,
) -> Result<promotion_balance::Model, ServiceError> {
    let balance = load_or_create_balance(conn, user_id).await?;
    if balance.total_points < points {
        return Err(ServiceError::InsufficientPoints(format!(
            "Need {} points, have {}",
            points, balance.total_points
        )));
    }

    let mut active: promotion_balance::ActiveModel = balance.clone().into();
    active.total_points = Set(balance.total_points - points);
    active.updated_at = Set(Utc::now());
    let updated = active.update(conn).await?;

    Ok(updated)
}

/// Handler-facing surface over the point ledger.
#[derive(Clone)]
pub struct PromotionLedgerService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl PromotionLedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, user_id: i64) -> Result<BalanceResponse, ServiceError> {
        let db = &*self.db_pool;
        let balance = load_or_create_balance(db, user_id).await?;
        Ok(balance.into())
    }

    /// Admin adjustment; positive or negative, clamped at zero.
    #[instrument(skip(self))]
    pub async fn adjust(&self, user_id: i64, delta: i64) -> Result<BalanceResponse, ServiceError> {
        let db = &*self.db_pool;
        let updated = apply_delta(db, user_id, delta).await?;

        info!(
            user_id = user_id,
            delta = delta,
            total_points = updated.total_points,
            "Point balance adjusted"
        );
        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::PointsAdjusted { user_id, delta })
                .await;
        }

        Ok(updated.into())
    }
}
