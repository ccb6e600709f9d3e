use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "UteShop API",
        version = "0.3.0",
        description = r#"
Storefront backend for UteShop: catalog, carts, order placement with coupon
and loyalty-point redemption, and product reviews.

## Authentication

Endpoints under `/api/v1` expect a JWT issued by the identity service:

```
Authorization: Bearer <your-jwt-token>
```

Admin endpoints additionally require the `admin` role.

## Error Handling

Failures share one shape:

```json
{
  "success": false,
  "error": "Bad Request",
  "message": "Coupon expired",
  "timestamp": "2026-01-01T00:00:00Z"
}
```
"#
    ),
    paths(
        handlers::products::list_products,
        handlers::products::best_sellers,
        handlers::products::get_product,
        handlers::products::product_reviews,
        handlers::products::create_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::orders::place_order,
        handlers::orders::my_orders,
        handlers::orders::get_order,
        handlers::orders::request_cancel,
        handlers::orders::admin_list_orders,
        handlers::orders::admin_order_stats,
        handlers::orders::admin_update_status,
        handlers::coupons::my_coupons,
        handlers::coupons::validate_coupon,
        handlers::coupons::redeem_coupon,
        handlers::coupons::list_templates,
        handlers::coupons::redeem_template,
        handlers::coupons::create_template,
        handlers::coupons::delete_template,
        handlers::promotions::my_balance,
        handlers::promotions::admin_adjust,
        handlers::carts::get_cart,
        handlers::carts::add_item,
        handlers::carts::update_item,
        handlers::carts::remove_item,
        handlers::carts::clear_cart,
        handlers::reviews::create_review,
        handlers::reviews::moderate_review,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::order::OrderStatus,
        crate::entities::order::LineItemSnapshot,
        crate::entities::order::ShippingAddress,
        crate::entities::coupon::CouponKind,
        crate::entities::review::ReviewStatus,
    )),
    tags(
        (name = "products", description = "Catalog browsing and admin product management"),
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "coupons", description = "Coupon wallet and templates"),
        (name = "promotions", description = "Loyalty point balances"),
        (name = "cart", description = "Shopping cart"),
        (name = "reviews", description = "Product reviews"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the generated document.
pub fn swagger_router<S>() -> axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .into()
}
