use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::order::{
    self, Entity as OrderEntity, LineItemSnapshot, LineItems, OrderStatus, ShippingAddress,
};
use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::coupons;
use crate::services::pricing::{self, POINT_VALUE};
use crate::services::promotion_ledger;

/// Window after creation during which a customer may flag an order for
/// cancellation.
const CANCEL_REQUEST_WINDOW_MINUTES: i64 = 30;

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct OrderLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PlaceOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderLineRequest>,
    #[validate]
    pub shipping_address: ShippingAddressRequest,
    /// Coupon code to apply, if any
    pub coupon_code: Option<String>,
    /// Loyalty points the customer wants to redeem
    #[serde(default)]
    pub redeem_points: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ShippingAddressRequest {
    #[validate(length(min = 1, message = "Recipient name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub district: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
}

impl From<ShippingAddressRequest> for ShippingAddress {
    fn from(req: ShippingAddressRequest) -> Self {
        ShippingAddress {
            full_name: req.full_name,
            phone: req.phone,
            street: req.street,
            ward: req.ward,
            district: req.district,
            city: req.city,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order: order::Model,
    pub subtotal: i64,
    /// Combined reduction: coupon discount plus redeemed points at face value
    pub discount: i64,
    pub coupon_discount: i64,
    pub points_redeemed: i64,
    pub points_earned: i64,
    /// Code of the coupon consumed by this order, if one was applied
    pub used_coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<order::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize)]
pub struct OrderStatsResponse {
    pub total_orders: u64,
    /// Sum of payable totals over completed orders
    pub total_revenue: i64,
    pub by_status: HashMap<String, u64>,
    /// Completed revenue per day over the last 14 days, oldest first
    pub revenue_by_day: Vec<DailyRevenue>,
    /// Top ten products by snapshot quantity across all orders
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Serialize)]
pub struct DailyRevenue {
    pub day: chrono::NaiveDate,
    pub revenue: i64,
}

#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_id: i64,
    pub name: String,
    pub quantity_sold: i64,
}

/// Order placement, lifecycle and admin reporting.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Places an order: snapshots products, applies coupon and point
    /// redemption, awards loyalty yield and persists everything in one
    /// transaction. The catalog is only read here; stock is checked, never
    /// adjusted. The customer notification fires after commit and never
    /// fails the request.
    ///
    /// Lines whose product no longer exists are dropped without error;
    /// a line whose product exists but lacks stock fails the whole order.
    #[instrument(skip(self, request), fields(user_id = user_id))]
    pub async fn place_order(
        &self,
        user_id: i64,
        request: PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start order transaction");
            ServiceError::DatabaseError(e)
        })?;

        // Snapshot lines against the live catalog. Unknown products drop out,
        // an existing product without stock aborts.
        let mut snapshots: Vec<LineItemSnapshot> = Vec::with_capacity(request.items.len());
        let mut points_earned: i64 = 0;
        for line in &request.items {
            // Unresolvable lines (gone product, non-positive quantity) drop
            // out instead of failing the order.
            if line.quantity <= 0 {
                continue;
            }
            let Some(found) = ProductEntity::find_by_id(line.product_id).one(&txn).await? else {
                continue;
            };
            if found.quantity < line.quantity {
                txn.rollback().await?;
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough stock for {}",
                    found.name
                )));
            }
            // Yield is per line, not per unit.
            points_earned += found.promotion_points as i64;
            snapshots.push(LineItemSnapshot {
                product_id: found.id,
                name: found.name,
                unit_price: found.price,
                image: found.image,
                quantity: line.quantity,
            });
        }

        if snapshots.is_empty() {
            txn.rollback().await?;
            return Err(ServiceError::EmptyOrder);
        }

        let totals = pricing::compute_cart_totals(&snapshots);

        // Coupon, validated before anything is written.
        let mut applied_coupon = None;
        let mut coupon_discount = 0;
        if let Some(code) = request.coupon_code.as_deref().filter(|c| !c.is_empty()) {
            let found = coupons::find_by_code(&txn, code)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Coupon not found".to_string()))?;
            pricing::validate_coupon(&found, user_id, totals.subtotal, now)?;
            coupon_discount =
                pricing::coupon_discount(found.kind, found.value, found.max_discount, totals.subtotal);
            applied_coupon = Some(found);
        }

        // Point redemption clamps silently to what the order and the balance
        // can actually support.
        let balance = promotion_ledger::load_or_create_balance(&txn, user_id).await?;
        let points_redeemed = pricing::compute_redemption(
            request.redeem_points,
            balance.total_points,
            totals.subtotal,
        );

        let discount = coupon_discount + points_redeemed * POINT_VALUE;
        let total_price = (totals.subtotal - discount).max(0);

        // Order row first, so the ledger and coupon writes can reference it in
        // audit logs, then points and coupon use.
        let created = order::ActiveModel {
            user_id: Set(user_id),
            items: Set(LineItems(snapshots)),
            total_price: Set(total_price),
            total_quantity: Set(totals.total_quantity),
            shipping_address: Set(request.shipping_address.into()),
            status: Set(OrderStatus::New),
            cancel_requested: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let net_points = points_earned - points_redeemed;
        if net_points != 0 {
            promotion_ledger::apply_delta(&txn, user_id, net_points).await?;
        }

        let used_coupon_code = applied_coupon.as_ref().map(|c| c.code.clone());
        if let Some(found) = applied_coupon {
            coupons::consume_use(&txn, found).await?;
        }

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit order transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = created.id,
            user_id = user_id,
            total_price = total_price,
            points_redeemed = points_redeemed,
            points_earned = points_earned,
            "Order placed"
        );
        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::OrderCreated {
                    order_id: created.id,
                    user_id,
                    total: total_price,
                })
                .await;
        }

        Ok(PlaceOrderResponse {
            order: created,
            subtotal: totals.subtotal,
            discount,
            coupon_discount,
            points_redeemed,
            points_earned,
            used_coupon_code,
        })
    }

    #[instrument(skip(self))]
    pub async fn my_orders(&self, user_id: i64) -> Result<Vec<order::Model>, ServiceError> {
        let db = &*self.db_pool;
        let orders = OrderEntity::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?;
        Ok(orders)
    }

    /// Fetches an order the caller is allowed to see. Admins see all orders,
    /// customers only their own; a foreign order reads as not found.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: i64,
        user_id: i64,
        is_admin: bool,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let found = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if !is_admin && found.user_id != user_id {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }
        Ok(found)
    }

    /// Flags an order for cancellation. Only allowed within the request
    /// window and before fulfilment starts; the flag does not change status,
    /// staff decide whether to honor it.
    #[instrument(skip(self))]
    pub async fn request_cancel(
        &self,
        order_id: i64,
        user_id: i64,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let found = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if found.user_id != user_id {
            return Err(ServiceError::NotFound("Order not found".to_string()));
        }
        if !matches!(found.status, OrderStatus::New | OrderStatus::Confirmed) {
            return Err(ServiceError::TerminalStateConflict(format!(
                "Cannot request cancellation in status {}",
                found.status
            )));
        }

        let age = Utc::now() - found.created_at;
        if age > Duration::minutes(CANCEL_REQUEST_WINDOW_MINUTES) {
            return Err(ServiceError::TerminalStateConflict(
                "Cancellation window has passed".to_string(),
            ));
        }

        let mut active: order::ActiveModel = found.into();
        active.cancel_requested = Set(true);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        info!(order_id = updated.id, "Cancellation requested");
        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::OrderCancelRequested { order_id, user_id })
                .await;
        }

        Ok(updated)
    }

    /// Admin status transition. Terminal orders reject any further change.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let found = OrderEntity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if found.status.is_terminal() {
            return Err(ServiceError::TerminalStateConflict(format!(
                "Order is already {}",
                found.status
            )));
        }

        let old_status = found.status;
        let mut active: order::ActiveModel = found.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        info!(
            order_id = updated.id,
            old_status = %old_status,
            new_status = %new_status,
            "Order status updated"
        );
        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::OrderStatusChanged {
                    order_id,
                    old_status: old_status.to_string(),
                    new_status: new_status.to_string(),
                })
                .await;
        }

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
        status: Option<OrderStatus>,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db_pool;
        let per_page = per_page.clamp(1, 100);

        let mut query = OrderEntity::find().order_by_desc(order::Column::CreatedAt);
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }

        let paginator = query.paginate(db, per_page);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page,
        })
    }

    /// Dashboard roll-up: counts per status, completed revenue, a 14-day
    /// revenue series and the best-selling products by snapshot quantity.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<OrderStatsResponse, ServiceError> {
        let db = &*self.db_pool;
        let orders = OrderEntity::find().all(db).await?;

        let window_start = (Utc::now() - Duration::days(13)).date_naive();

        let mut by_status: HashMap<String, u64> = HashMap::new();
        let mut total_revenue = 0;
        let mut daily: HashMap<chrono::NaiveDate, i64> = HashMap::new();
        let mut sold: HashMap<i64, (String, i64)> = HashMap::new();
        for o in &orders {
            *by_status.entry(o.status.to_string()).or_insert(0) += 1;
            if o.status == OrderStatus::Completed {
                total_revenue += o.total_price;
                let day = o.created_at.date_naive();
                if day >= window_start {
                    *daily.entry(day).or_insert(0) += o.total_price;
                }
            }
            for line in &o.items.0 {
                let entry = sold
                    .entry(line.product_id)
                    .or_insert_with(|| (line.name.clone(), 0));
                entry.1 += line.quantity as i64;
            }
        }

        let mut revenue_by_day: Vec<DailyRevenue> = daily
            .into_iter()
            .map(|(day, revenue)| DailyRevenue { day, revenue })
            .collect();
        revenue_by_day.sort_by_key(|d| d.day);

        let mut top_products: Vec<TopProduct> = sold
            .into_iter()
            .map(|(product_id, (name, quantity_sold))| TopProduct {
                product_id,
                name,
                quantity_sold,
            })
            .collect();
        top_products.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
        top_products.truncate(10);

        Ok(OrderStatsResponse {
            total_orders: orders.len() as u64,
            total_revenue,
            by_status,
            revenue_by_day,
            top_products,
        })
    }
}
