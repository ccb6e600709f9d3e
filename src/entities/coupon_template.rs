use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::coupon::CouponKind;

/// Admin-defined pattern from which users mint coupons by spending points.
/// Templates are only ever mutated through the admin surface.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub kind: CouponKind,
    pub value: i64,
    pub min_order: i64,
    pub max_discount: i64,
    pub cost_points: i32,
    pub expires_in_days: i32,
    pub uses_per_coupon: i32,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
