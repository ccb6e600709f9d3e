use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::order::LineItems;

/// One cart per user, lazily created. Items are product snapshots taken at
/// add time; totals are recomputed on every mutation.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "carts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub user_id: i64,
    #[sea_orm(column_type = "Json")]
    pub items: LineItems,
    pub total_price: i64,
    pub total_quantity: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
