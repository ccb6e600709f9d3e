use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::coupon::{self, CouponKind, Entity as CouponEntity};
use crate::entities::coupon_template::{self, Entity as TemplateEntity};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::pricing;
use crate::services::promotion_ledger;

const CODE_PREFIX: &str = "CP";
const CODE_RANDOM_LEN: usize = 4;
const CODE_GEN_ATTEMPTS: usize = 5;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, message = "Template name is required"))]
    pub name: String,
    pub kind: CouponKind,
    #[validate(range(min = 1, message = "Value must be positive"))]
    pub value: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Minimum order cannot be negative"))]
    pub min_order: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Maximum discount cannot be negative"))]
    pub max_discount: i64,
    #[validate(range(min = 1, message = "Point cost must be positive"))]
    pub cost_points: i32,
    #[validate(range(min = 1, message = "Expiry must be at least one day"))]
    pub expires_in_days: i32,
    #[serde(default = "default_uses")]
    #[validate(range(min = 1, message = "Uses must be at least one"))]
    pub uses_per_coupon: i32,
}

fn default_uses() -> i32 {
    1
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RedeemCouponRequest {
    pub kind: CouponKind,
    #[validate(range(min = 1, message = "Value must be positive"))]
    pub value: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Minimum order cannot be negative"))]
    pub min_order: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "Maximum discount cannot be negative"))]
    pub max_discount: i64,
    #[validate(range(min = 1, message = "Point cost must be positive"))]
    pub cost_points: i64,
    #[validate(range(min = 1, message = "Expiry must be at least one day"))]
    pub expires_in_days: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponPreviewResponse {
    pub code: String,
    pub subtotal: i64,
    pub discount: i64,
    pub payable: i64,
}

/// Generates a candidate coupon code: prefix, minting instant in base36,
/// and a short random alphanumeric tail.
fn generate_code<R: Rng>(rng: &mut R, now_millis: i64) -> String {
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let mut stamp = String::new();
    let mut n = now_millis.unsigned_abs();
    while n > 0 {
        stamp.push(ALPHABET[(n % 36) as usize] as char);
        n /= 36;
    }
    let stamp: String = stamp.chars().rev().collect();

    let tail: String = (0..CODE_RANDOM_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();

    format!("{}{}{}", CODE_PREFIX, stamp, tail)
}

/// Decrements `uses_remaining` on an applied coupon. Runs inside the order
/// transaction so a failed order never burns a use.
pub async fn consume_use<C: ConnectionTrait>(
    conn: &C,
    coupon: coupon::Model,
) -> Result<coupon::Model, ServiceError> {
    let remaining = coupon.uses_remaining;
    let mut active: coupon::ActiveModel = coupon.into();
    active.uses_remaining = Set((remaining - 1).max(0));
    let updated = active.update(conn).await?;
    Ok(updated)
}

pub async fn find_by_code<C: ConnectionTrait>(
    conn: &C,
    code: &str,
) -> Result<Option<coupon::Model>, ServiceError> {
    let found = CouponEntity::find()
        .filter(coupon::Column::Code.eq(code))
        .one(conn)
        .await?;
    Ok(found)
}

/// Coupon wallet and template operations.
#[derive(Clone)]
pub struct CouponService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CouponService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// The caller's full wallet, newest first. Expired and spent coupons stay
    /// in the listing; clients render their state.
    #[instrument(skip(self))]
    pub async fn list_my_coupons(&self, user_id: i64) -> Result<Vec<coupon::Model>, ServiceError> {
        let db = &*self.db_pool;
        let coupons = CouponEntity::find()
            .filter(coupon::Column::OwnerUserId.eq(user_id))
            .order_by_desc(coupon::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(coupons)
    }

    /// Dry-run of applying a coupon to a subtotal, without consuming a use.
    #[instrument(skip(self))]
    pub async fn preview(
        &self,
        user_id: i64,
        code: &str,
        subtotal: i64,
    ) -> Result<CouponPreviewResponse, ServiceError> {
        let db = &*self.db_pool;
        let found = find_by_code(db, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;

        pricing::validate_coupon(&found, user_id, subtotal, Utc::now())?;
        let discount =
            pricing::coupon_discount(found.kind, found.value, found.max_discount, subtotal);

        Ok(CouponPreviewResponse {
            code: found.code,
            subtotal,
            discount,
            payable: subtotal - discount,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_templates(&self) -> Result<Vec<coupon_template::Model>, ServiceError> {
        let db = &*self.db_pool;
        let templates = TemplateEntity::find()
            .order_by_desc(coupon_template::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(templates)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_template(
        &self,
        request: CreateTemplateRequest,
    ) -> Result<coupon_template::Model, ServiceError> {
        request.validate()?;
        if request.kind == CouponKind::Percent && request.value > 100 {
            return Err(ServiceError::ValidationError(
                "Percent value cannot exceed 100".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let created = coupon_template::ActiveModel {
            name: Set(request.name),
            kind: Set(request.kind),
            value: Set(request.value),
            min_order: Set(request.min_order),
            max_discount: Set(request.max_discount),
            cost_points: Set(request.cost_points),
            expires_in_days: Set(request.expires_in_days),
            uses_per_coupon: Set(request.uses_per_coupon),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(template_id = created.id, "Coupon template created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn delete_template(&self, template_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = TemplateEntity::delete_by_id(template_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Template not found".to_string()));
        }
        Ok(())
    }

    /// Mints a coupon from a template, paying its point cost.
    #[instrument(skip(self))]
    pub async fn redeem_from_template(
        &self,
        user_id: i64,
        template_id: i64,
    ) -> Result<coupon::Model, ServiceError> {
        let db = &*self.db_pool;
        let template = TemplateEntity::find_by_id(template_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Template not found".to_string()))?;

        self.mint_with_debit(
            user_id,
            MintParams {
                kind: template.kind,
                value: template.value,
                min_order: template.min_order,
                max_discount: template.max_discount,
                cost_points: template.cost_points as i64,
                expires_in_days: Some(template.expires_in_days),
                uses: template.uses_per_coupon,
            },
        )
        .await
    }

    /// Mints a coupon from caller-supplied parameters rather than a template,
    /// debiting the stated point cost.
    #[instrument(skip(self, request))]
    pub async fn redeem_ad_hoc(
        &self,
        user_id: i64,
        request: RedeemCouponRequest,
    ) -> Result<coupon::Model, ServiceError> {
        request.validate()?;
        if request.kind == CouponKind::Percent && request.value > 100 {
            return Err(ServiceError::ValidationError(
                "Percent value cannot exceed 100".to_string(),
            ));
        }

        self.mint_with_debit(
            user_id,
            MintParams {
                kind: request.kind,
                value: request.value,
                min_order: request.min_order,
                max_discount: request.max_discount,
                cost_points: request.cost_points,
                expires_in_days: request.expires_in_days,
                uses: 1,
            },
        )
        .await
    }

    /// Point debit and coupon insert commit together or not at all.
    async fn mint_with_debit(
        &self,
        user_id: i64,
        params: MintParams,
    ) -> Result<coupon::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start coupon redemption transaction");
            ServiceError::DatabaseError(e)
        })?;

        promotion_ledger::debit_exact(&txn, user_id, params.cost_points).await?;

        let now = Utc::now();
        let expires_at = params
            .expires_in_days
            .map(|days| now + Duration::days(days as i64));

        // Unique code generation with bounded retry on collision.
        let mut minted = None;
        for attempt in 0..CODE_GEN_ATTEMPTS {
            let code = generate_code(&mut rand::thread_rng(), now.timestamp_millis());
            if find_by_code(&txn, &code).await?.is_some() {
                warn!(attempt = attempt, "Coupon code collision, retrying");
                continue;
            }
            let created = coupon::ActiveModel {
                code: Set(code),
                owner_user_id: Set(user_id),
                kind: Set(params.kind),
                value: Set(params.value),
                min_order: Set(params.min_order),
                max_discount: Set(params.max_discount),
                expires_at: Set(expires_at),
                uses_remaining: Set(params.uses),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            minted = Some(created);
            break;
        }

        let Some(minted) = minted else {
            txn.rollback().await?;
            return Err(ServiceError::InternalError(
                "Could not allocate a unique coupon code".to_string(),
            ));
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit coupon redemption");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            coupon_id = minted.id,
            user_id = user_id,
            cost_points = params.cost_points,
            "Coupon minted"
        );
        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::CouponMinted {
                    coupon_id: minted.id,
                    user_id,
                    cost_points: params.cost_points,
                })
                .await;
        }

        Ok(minted)
    }
}

#[derive(Debug)]
struct MintParams {
    kind: CouponKind,
    value: i64,
    min_order: i64,
    max_discount: i64,
    cost_points: i64,
    expires_in_days: Option<i32>,
    uses: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_has_prefix_and_random_tail() {
        let mut rng = rand::thread_rng();
        let code = generate_code(&mut rng, 1_700_000_000_000);
        assert!(code.starts_with(CODE_PREFIX));
        assert!(code.len() > CODE_PREFIX.len() + CODE_RANDOM_LEN);
        assert!(code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn codes_differ_across_calls() {
        let mut rng = rand::thread_rng();
        let a = generate_code(&mut rng, 1_700_000_000_000);
        let b = generate_code(&mut rng, 1_700_000_000_001);
        assert_ne!(a, b);
    }
}
