use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A minted, user-owned discount voucher. `uses_remaining` never goes below
/// zero; a coupon with zero uses or a past `expires_at` is inapplicable.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub owner_user_id: i64,
    pub kind: CouponKind,
    /// Currency amount for FIXED, 1-100 for PERCENT
    pub value: i64,
    pub min_order: i64,
    /// 0 means uncapped (PERCENT only)
    pub max_discount: i64,
    pub expires_at: Option<ChronoDateTimeUtc>,
    pub uses_remaining: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum CouponKind {
    #[sea_orm(string_value = "FIXED")]
    #[serde(rename = "FIXED")]
    Fixed,
    #[sea_orm(string_value = "PERCENT")]
    #[serde(rename = "PERCENT")]
    Percent,
}
