use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A product captured at the moment it was ordered. Snapshots are embedded in
/// the order as JSON and never change when the catalog does.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema)]
pub struct LineItemSnapshot {
    pub product_id: i64,
    pub name: String,
    pub unit_price: i64,
    #[schema(value_type = Object)]
    pub image: Json,
    pub quantity: i32,
}

#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct LineItems(pub Vec<LineItemSnapshot>);

/// Structured delivery address stored alongside the order.
#[derive(
    Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub district: String,
    pub city: String,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    #[sea_orm(column_type = "Json")]
    pub items: LineItems,
    /// Post-discount payable total, never negative
    pub total_price: i64,
    pub total_quantity: i32,
    #[sea_orm(column_type = "Json")]
    pub shipping_address: ShippingAddress,
    pub status: OrderStatus,
    pub cancel_requested: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle. COMPLETED and CANCELLED are terminal for status updates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::EnumString,
    strum::Display,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OrderStatus {
    #[sea_orm(string_value = "NEW")]
    #[serde(rename = "NEW")]
    New,
    #[sea_orm(string_value = "CONFIRMED")]
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "PREPARING")]
    #[serde(rename = "PREPARING")]
    Preparing,
    #[sea_orm(string_value = "SHIPPING")]
    #[serde(rename = "SHIPPING")]
    Shipping,
    #[sea_orm(string_value = "COMPLETED")]
    #[serde(rename = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses reject any further status update.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}
