//! UteShop storefront API.
//!
//! Order pricing, coupon and loyalty-point redemption for the UteShop
//! e-commerce backend, plus the catalog, cart and review surfaces the
//! storefront needs around them.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::Json, routing::get, Extension, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;

/// Shared per-request application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub event_sender: EventSender,
    pub services: AppServices,
}

/// The service layer, one instance per process.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: services::CatalogService,
    pub orders: services::OrderService,
    pub coupons: services::CouponService,
    pub promotions: services::PromotionLedgerService,
    pub carts: services::CartService,
    pub reviews: services::ReviewService,
}

impl AppServices {
    pub fn build(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        let sender = Arc::new(event_sender);
        Self {
            catalog: services::CatalogService::new(db.clone()),
            orders: services::OrderService::new(db.clone(), Some(sender.clone())),
            coupons: services::CouponService::new(db.clone(), Some(sender.clone())),
            promotions: services::PromotionLedgerService::new(db.clone(), Some(sender.clone())),
            carts: services::CartService::new(db.clone(), Some(sender.clone())),
            reviews: services::ReviewService::new(db, Some(sender)),
        }
    }
}

/// Standard success envelope shared by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// All versioned API routes.
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::products::router())
        .merge(handlers::orders::router())
        .merge(handlers::coupons::router())
        .merge(handlers::promotions::router())
        .merge(handlers::carts::router())
        .merge(handlers::reviews::router())
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let status_data = json!({
        "status": "ok",
        "service": "uteshop-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    Json(ApiResponse::success(health_data))
}

/// Assembles the full application router with middleware applied.
pub fn build_app(state: AppState, auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_router())
        .layer(Extension(auth_service))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data() {
        let response = ApiResponse::success(42);
        assert!(response.success);
        assert_eq!(response.data, Some(42));
        assert!(response.message.is_none());
    }

    #[test]
    fn message_envelope_has_no_data() {
        let response = ApiResponse::<()>::message("done");
        assert!(response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("done"));
    }
}
