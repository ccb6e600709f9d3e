use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::cart::{self, Entity as CartEntity};
use crate::entities::order::{LineItemSnapshot, LineItems};
use crate::entities::product::Entity as ProductEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::pricing;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least one"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    /// Zero removes the line
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
}

/// Per-user shopping cart. Carts hold product snapshots; checkout re-reads the
/// live catalog, so a stale cart price never leaks into an order.
#[derive(Clone)]
pub struct CartService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CartService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: i64) -> Result<cart::Model, ServiceError> {
        self.load_or_create(user_id).await
    }

    async fn load_or_create(&self, user_id: i64) -> Result<cart::Model, ServiceError> {
        let db = &*self.db_pool;
        if let Some(found) = CartEntity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?
        {
            return Ok(found);
        }

        let now = Utc::now();
        let created = cart::ActiveModel {
            user_id: Set(user_id),
            items: Set(LineItems::default()),
            total_price: Set(0),
            total_quantity: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(created)
    }

    async fn persist(
        &self,
        model: cart::Model,
        items: Vec<LineItemSnapshot>,
    ) -> Result<cart::Model, ServiceError> {
        let db = &*self.db_pool;
        let totals = pricing::compute_cart_totals(&items);

        let cart_id = model.id;
        let user_id = model.user_id;
        let mut active: cart::ActiveModel = model.into();
        active.items = Set(LineItems(items));
        active.total_price = Set(totals.subtotal);
        active.total_quantity = Set(totals.total_quantity);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        if let Some(sender) = &self.event_sender {
            sender
                .publish_best_effort(Event::CartUpdated { cart_id, user_id })
                .await;
        }
        Ok(updated)
    }

    /// Adds a product to the cart, merging quantities when the line already
    /// exists. The combined quantity must be coverable by current stock.
    #[instrument(skip(self, request), fields(product_id = request.product_id))]
    pub async fn add_item(
        &self,
        user_id: i64,
        request: AddCartItemRequest,
    ) -> Result<cart::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let found = ProductEntity::find_by_id(request.product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let model = self.load_or_create(user_id).await?;
        let mut items = model.items.0.clone();

        let wanted = match items
            .iter()
            .find(|i| i.product_id == request.product_id)
        {
            Some(existing) => existing.quantity + request.quantity,
            None => request.quantity,
        };
        if found.quantity < wanted {
            return Err(ServiceError::InsufficientStock(format!(
                "Not enough stock for {}",
                found.name
            )));
        }

        match items
            .iter_mut()
            .find(|i| i.product_id == request.product_id)
        {
            Some(existing) => {
                existing.quantity = wanted;
                // Refresh the snapshot so the cart shows current pricing
                existing.unit_price = found.price;
                existing.name = found.name.clone();
                existing.image = found.image.clone();
            }
            None => items.push(LineItemSnapshot {
                product_id: found.id,
                name: found.name.clone(),
                unit_price: found.price,
                image: found.image.clone(),
                quantity: request.quantity,
            }),
        }

        info!(user_id = user_id, product_id = found.id, "Cart item added");
        self.persist(model, items).await
    }

    /// Sets the quantity of a cart line; zero removes it.
    #[instrument(skip(self, request))]
    pub async fn update_item(
        &self,
        user_id: i64,
        product_id: i64,
        request: UpdateCartItemRequest,
    ) -> Result<cart::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let model = self.load_or_create(user_id).await?;
        let mut items = model.items.0.clone();

        if !items.iter().any(|i| i.product_id == product_id) {
            return Err(ServiceError::NotFound("Item not in cart".to_string()));
        }

        if request.quantity == 0 {
            items.retain(|i| i.product_id != product_id);
        } else {
            let found = ProductEntity::find_by_id(product_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
            if found.quantity < request.quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough stock for {}",
                    found.name
                )));
            }
            for item in items.iter_mut() {
                if item.product_id == product_id {
                    item.quantity = request.quantity;
                }
            }
        }

        self.persist(model, items).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: i64,
        product_id: i64,
    ) -> Result<cart::Model, ServiceError> {
        let model = self.load_or_create(user_id).await?;
        let mut items = model.items.0.clone();

        let before = items.len();
        items.retain(|i| i.product_id != product_id);
        if items.len() == before {
            return Err(ServiceError::NotFound("Item not in cart".to_string()));
        }

        self.persist(model, items).await
    }

    #[instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: i64) -> Result<cart::Model, ServiceError> {
        let model = self.load_or_create(user_id).await?;
        self.persist(model, Vec::new()).await
    }
}
