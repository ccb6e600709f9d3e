use proptest::prelude::*;

use uteshop_api::entities::coupon::CouponKind;
use uteshop_api::services::pricing::{
    compute_cart_totals, compute_redemption, coupon_discount, POINT_VALUE,
};

proptest! {
    #[test]
    fn discount_never_exceeds_subtotal(
        value in 0i64..10_000_000,
        max_discount in 0i64..1_000_000,
        subtotal in 0i64..10_000_000,
    ) {
        for kind in [CouponKind::Fixed, CouponKind::Percent] {
            let value = if kind == CouponKind::Percent { value % 101 } else { value };
            let discount = coupon_discount(kind, value, max_discount, subtotal);
            prop_assert!(discount >= 0);
            prop_assert!(discount <= subtotal);
        }
    }

    #[test]
    fn percent_discount_honors_cap_when_set(
        value in 1i64..=100,
        max_discount in 1i64..500_000,
        subtotal in 0i64..10_000_000,
    ) {
        let discount = coupon_discount(CouponKind::Percent, value, max_discount, subtotal);
        prop_assert!(discount <= max_discount);
    }

    #[test]
    fn redemption_respects_every_bound(
        requested in -1_000i64..1_000_000,
        available in -1_000i64..1_000_000,
        subtotal in 0i64..100_000_000,
    ) {
        let redeemed = compute_redemption(requested, available, subtotal);
        prop_assert!(redeemed >= 0);
        prop_assert!(redeemed <= requested.max(0));
        prop_assert!(redeemed <= available.max(0));
        prop_assert!(redeemed * POINT_VALUE <= subtotal);
    }

    #[test]
    fn payable_total_never_goes_negative(
        unit_price in 0i64..1_000_000,
        quantity in 1i32..50,
        value in 0i64..10_000_000,
        redeem in 0i64..1_000_000,
        available in 0i64..1_000_000,
    ) {
        let items = vec![uteshop_api::entities::order::LineItemSnapshot {
            product_id: 1,
            name: "item".to_string(),
            unit_price,
            image: serde_json::json!({}),
            quantity,
        }];
        let totals = compute_cart_totals(&items);
        let discount = coupon_discount(CouponKind::Fixed, value, 0, totals.subtotal);
        let redeemed = compute_redemption(redeem, available, totals.subtotal);
        let payable = (totals.subtotal - discount - redeemed * POINT_VALUE).max(0);
        prop_assert!(payable >= 0);
        prop_assert!(payable <= totals.subtotal);
    }
}
