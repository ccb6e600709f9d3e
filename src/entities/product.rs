use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Catalog product. Prices are integers in the smallest currency unit;
/// `quantity` is the sellable stock and `promotion_points` the loyalty
/// yield awarded when the product appears on an order line.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub quantity: i32,
    #[sea_orm(column_type = "Json")]
    pub image: Json,
    pub count_sell: i32,
    pub click_view: i32,
    pub promotion_points: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::review::Entity")]
    Reviews,
}

impl Related<super::review::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
