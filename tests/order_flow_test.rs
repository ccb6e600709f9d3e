mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{shipping_address, TestApp};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uteshop_api::entities::{order, product};

#[tokio::test]
async fn placing_an_order_snapshots_prices_and_awards_points() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 5).await;
    let token = app.user_token(1);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [{"product_id": tee.id, "quantity": 2}],
                "shipping_address": shipping_address(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["subtotal"], 300_000);
    assert_eq!(data["discount"], 0);
    assert_eq!(data["used_coupon_code"], serde_json::Value::Null);
    assert_eq!(data["order"]["total_price"], 300_000);
    assert_eq!(data["order"]["total_quantity"], 2);
    assert_eq!(data["order"]["status"], "NEW");
    assert_eq!(data["order"]["cancel_requested"], false);
    assert_eq!(data["points_earned"], 5);

    // Checkout only reads the catalog; stock and sell counters stay put
    let reloaded = product::Entity::find_by_id(tee.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.quantity, 10);
    assert_eq!(reloaded.count_sell, 0);

    // Yield landed on the balance
    let (status, body) = app
        .request(Method::GET, "/api/v1/promotions/balance", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_points"], 5);
}

#[tokio::test]
async fn unknown_products_drop_out_but_known_lines_survive() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 0).await;
    let token = app.user_token(1);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [
                    {"product_id": tee.id, "quantity": 1},
                    {"product_id": 999_999, "quantity": 3},
                ],
                "shipping_address": shipping_address(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["subtotal"], 150_000);
    assert_eq!(body["data"]["order"]["total_quantity"], 1);
}

#[tokio::test]
async fn order_of_only_unknown_products_is_rejected() {
    let app = TestApp::new().await;
    let token = app.user_token(1);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [{"product_id": 123_456, "quantity": 1}],
                "shipping_address": shipping_address(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn insufficient_stock_fails_whole_order_and_writes_nothing() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 5).await;
    let scarce = app.seed_product("Limited Jacket", 900_000, 1, 20).await;
    let token = app.user_token(1);

    let (status, _body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [
                    {"product_id": tee.id, "quantity": 2},
                    {"product_id": scarce.id, "quantity": 5},
                ],
                "shipping_address": shipping_address(),
            })),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Nothing committed: no order rows, stock untouched, no points
    let orders = order::Entity::find().all(&*app.state.db).await.unwrap();
    assert!(orders.is_empty());
    let reloaded = product::Entity::find_by_id(tee.id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.quantity, 10);
    assert_eq!(reloaded.count_sell, 0);

    let (_, body) = app
        .request(Method::GET, "/api/v1/promotions/balance", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total_points"], 0);
}

#[tokio::test]
async fn point_redemption_clamps_to_balance_and_order_cap() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 5).await;
    app.seed_balance(7, 50).await;
    let token = app.user_token(7);

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "items": [{"product_id": tee.id, "quantity": 2}],
                "shipping_address": shipping_address(),
                "redeem_points": 1_000,
            })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    // 1000 requested, 50 held, cap 3000: 50 redeemed at 100 each
    assert_eq!(body["data"]["points_redeemed"], 50);
    assert_eq!(body["data"]["discount"], 5_000);
    assert_eq!(body["data"]["order"]["total_price"], 295_000);

    // Balance: 50 spent, 5 earned
    let (_, body) = app
        .request(Method::GET, "/api/v1/promotions/balance", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total_points"], 5);
}

async fn backdate_order(app: &TestApp, order_id: i64, minutes: i64) {
    let found = order::Entity::find_by_id(order_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    let mut active: order::ActiveModel = found.into();
    active.created_at = Set(Utc::now() - Duration::minutes(minutes));
    active.update(&*app.state.db).await.unwrap();
}

async fn place_simple_order(app: &TestApp, token: &str, product_id: i64) -> i64 {
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(token),
            Some(json!({
                "items": [{"product_id": product_id, "quantity": 1}],
                "shipping_address": shipping_address(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["order"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn cancel_request_honors_the_thirty_minute_window() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 0).await;
    let token = app.user_token(1);

    let inside = place_simple_order(&app, &token, tee.id).await;
    backdate_order(&app, inside, 29).await;
    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{inside}/cancel-request"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cancel_requested"], true);
    assert_eq!(body["data"]["status"], "NEW");

    let outside = place_simple_order(&app, &token, tee.id).await;
    backdate_order(&app, outside, 31).await;
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{outside}/cancel-request"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_request_rejected_once_fulfilment_started() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 0).await;
    let token = app.user_token(1);
    let admin = app.admin_token(100);

    let order_id = place_simple_order(&app, &token, tee.id).await;
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({"status": "SHIPPING"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/orders/{order_id}/cancel-request"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn terminal_orders_reject_status_updates() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 0).await;
    let token = app.user_token(1);
    let admin = app.admin_token(100);

    let order_id = place_simple_order(&app, &token, tee.id).await;
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({"status": "COMPLETED"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/v1/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({"status": "CONFIRMED"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn customers_cannot_see_each_others_orders() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 0).await;
    let owner = app.user_token(1);
    let stranger = app.user_token(2);
    let admin = app.admin_token(100);

    let order_id = place_simple_order(&app, &owner, tee.id).await;

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&stranger),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn order_endpoints_require_authentication() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::GET, "/api/v1/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = app.user_token(1);
    let (status, _) = app
        .request(Method::GET, "/api/v1/admin/orders", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_stats_count_completed_revenue_only() {
    let app = TestApp::new().await;
    let tee = app.seed_product("Basic Tee", 150_000, 10, 0).await;
    let token = app.user_token(1);
    let admin = app.admin_token(100);

    let first = place_simple_order(&app, &token, tee.id).await;
    let _second = place_simple_order(&app, &token, tee.id).await;

    app.request(
        Method::PATCH,
        &format!("/api/v1/admin/orders/{first}/status"),
        Some(&admin),
        Some(json!({"status": "COMPLETED"})),
    )
    .await;

    let (status, body) = app
        .request(Method::GET, "/api/v1/admin/orders/stats", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_orders"], 2);
    assert_eq!(body["data"]["total_revenue"], 150_000);
    assert_eq!(body["data"]["by_status"]["COMPLETED"], 1);
    assert_eq!(body["data"]["by_status"]["NEW"], 1);

    // Today's completed revenue shows in the 14-day series
    let series = body["data"]["revenue_by_day"].as_array().unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series[0]["revenue"], 150_000);

    // Both orders count toward the product leaderboard
    let top = body["data"]["top_products"].as_array().unwrap();
    assert_eq!(top[0]["product_id"], tee.id);
    assert_eq!(top[0]["quantity_sold"], 2);
}
