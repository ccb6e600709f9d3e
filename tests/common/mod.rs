use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

use uteshop_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    entities::{coupon, coupon_template, product, promotion_balance},
    events::{self, EventSender},
    migrator::Migrator,
    AppServices, AppState,
};

pub const TEST_JWT_SECRET: &str = "uteshop_test_secret_not_for_production_use";

/// Test harness: the full router over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    auth_service: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // One connection keeps every query on the same in-memory database.
        let mut options = ConnectOptions::new("sqlite::memory:".to_string());
        options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(std::time::Duration::from_secs(600))
            .sqlx_logging(false);
        let pool = Database::connect(options)
            .await
            .expect("failed to open in-memory database");

        Migrator::up(&pool, None)
            .await
            .expect("failed to run migrations");

        let db = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(&AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_expiry_hours: 1,
        }));

        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_expiry_hours: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
            log_level: "warn".to_string(),
            environment: "test".to_string(),
            event_buffer: 64,
        };

        let services = AppServices::build(db.clone(), event_sender.clone());
        let state = AppState {
            db,
            config,
            event_sender,
            services,
        };

        let router = uteshop_api::build_app(state.clone(), auth_service.clone());

        Self {
            router,
            state,
            auth_service,
            _event_task: event_task,
        }
    }

    pub fn user_token(&self, user_id: i64) -> String {
        self.auth_service
            .generate_token(user_id, "user")
            .expect("token generation")
    }

    pub fn admin_token(&self, user_id: i64) -> String {
        self.auth_service
            .generate_token(user_id, "admin")
            .expect("token generation")
    }

    /// Sends a JSON request through the router and returns status and parsed body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("request build"),
            None => builder.body(Body::empty()).expect("request build"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router call");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body read");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    /// Inserts a product directly, bypassing the admin API.
    pub async fn seed_product(
        &self,
        name: &str,
        price: i64,
        quantity: i32,
        promotion_points: i32,
    ) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            name: Set(name.to_string()),
            description: Set(format!("{name} description")),
            price: Set(price),
            quantity: Set(quantity),
            image: Set(json!([])),
            count_sell: Set(0),
            click_view: Set(0),
            promotion_points: Set(promotion_points),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }

    pub async fn seed_balance(&self, user_id: i64, points: i64) -> promotion_balance::Model {
        let now = Utc::now();
        promotion_balance::ActiveModel {
            user_id: Set(user_id),
            total_points: Set(points),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed balance")
    }

    pub async fn seed_coupon(
        &self,
        owner_user_id: i64,
        code: &str,
        kind: coupon::CouponKind,
        value: i64,
        min_order: i64,
        max_discount: i64,
        uses_remaining: i32,
        expires_at: Option<chrono::DateTime<Utc>>,
    ) -> coupon::Model {
        coupon::ActiveModel {
            code: Set(code.to_string()),
            owner_user_id: Set(owner_user_id),
            kind: Set(kind),
            value: Set(value),
            min_order: Set(min_order),
            max_discount: Set(max_discount),
            expires_at: Set(expires_at),
            uses_remaining: Set(uses_remaining),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon")
    }

    pub async fn seed_template(
        &self,
        name: &str,
        kind: coupon::CouponKind,
        value: i64,
        cost_points: i32,
    ) -> coupon_template::Model {
        coupon_template::ActiveModel {
            name: Set(name.to_string()),
            kind: Set(kind),
            value: Set(value),
            min_order: Set(0),
            max_discount: Set(0),
            cost_points: Set(cost_points),
            expires_in_days: Set(30),
            uses_per_coupon: Set(1),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed template")
    }
}

/// Shorthand for the default shipping address payload used across tests.
pub fn shipping_address() -> Value {
    json!({
        "full_name": "Nguyen Van A",
        "phone": "0900000000",
        "street": "1 Vo Van Ngan",
        "ward": "Linh Chieu",
        "district": "Thu Duc",
        "city": "Ho Chi Minh City"
    })
}
