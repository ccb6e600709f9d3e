use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::errors::ServiceError;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: i64,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: i32,
    #[serde(default = "default_image")]
    #[schema(value_type = Object)]
    pub image: serde_json::Value,
    #[serde(default)]
    #[validate(range(min = 0, message = "Promotion points cannot be negative"))]
    pub promotion_points: i32,
}

fn default_image() -> serde_json::Value {
    serde_json::json!([])
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price: Option<i64>,
    #[validate(range(min = 0, message = "Quantity cannot be negative"))]
    pub quantity: Option<i32>,
    #[schema(value_type = Object)]
    pub image: Option<serde_json::Value>,
    #[validate(range(min = 0, message = "Promotion points cannot be negative"))]
    pub promotion_points: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<product::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Catalog reads and admin product management.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let db = &*self.db_pool;
        let per_page = per_page.clamp(1, 100);
        let paginator = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(db, per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ProductListResponse {
            products,
            total,
            page,
            per_page,
        })
    }

    /// Fetches a product and bumps its view counter. The counter write is
    /// best-effort accounting, not part of any invariant.
    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: i64) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;
        let found = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let mut active: product::ActiveModel = found.clone().into();
        active.click_view = Set(found.click_view + 1);
        let updated = active.update(db).await?;

        Ok(updated)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();
        let model = product::ActiveModel {
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            quantity: Set(request.quantity),
            image: Set(request.image),
            count_sell: Set(0),
            click_view: Set(0),
            promotion_points: Set(request.promotion_points),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = model.insert(db).await?;
        info!(product_id = created.id, "Product created");
        Ok(created)
    }

    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        product_id: i64,
        request: UpdateProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let found = ProductEntity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let mut active: product::ActiveModel = found.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(image) = request.image {
            active.image = Set(image);
        }
        if let Some(points) = request.promotion_points {
            active.promotion_points = Set(points);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;
        info!(product_id = updated.id, "Product updated");
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i64) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = ProductEntity::delete_by_id(product_id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound("Product not found".to_string()));
        }
        info!(product_id = product_id, "Product deleted");
        Ok(())
    }

    /// Top sellers for the storefront landing page.
    #[instrument(skip(self))]
    pub async fn best_sellers(&self, limit: u64) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;
        let products = ProductEntity::find()
            .filter(product::Column::CountSell.gt(0))
            .order_by_desc(product::Column::CountSell)
            .paginate(db, limit.clamp(1, 50))
            .fetch_page(0)
            .await?;
        Ok(products)
    }
}
