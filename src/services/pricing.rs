use chrono::{DateTime, Utc};

use crate::entities::coupon::{self, CouponKind};
use crate::entities::order::LineItemSnapshot;
use crate::errors::ServiceError;

/// One point is worth 100 currency units when redeemed against an order.
pub const POINT_VALUE: i64 = 100;

/// Subtotal and unit count over a set of priced lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub subtotal: i64,
    pub total_quantity: i32,
}

/// Sums `unit_price * quantity` across lines. Lines are trusted snapshots at
/// this point; stock and existence checks happen before pricing.
pub fn compute_cart_totals(items: &[LineItemSnapshot]) -> CartTotals {
    let mut totals = CartTotals::default();
    for item in items {
        totals.subtotal += item.unit_price * item.quantity as i64;
        totals.total_quantity += item.quantity;
    }
    totals
}

/// Checks whether `coupon` can be applied by `user_id` to an order with the
/// given subtotal. Checks run in a fixed order so the client always sees the
/// most specific failure: ownership, uses, expiry, then minimum order.
pub fn validate_coupon(
    coupon: &coupon::Model,
    user_id: i64,
    subtotal: i64,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    if coupon.owner_user_id != user_id {
        return Err(ServiceError::NotFound("Coupon not found".to_string()));
    }
    if coupon.uses_remaining <= 0 {
        return Err(ServiceError::CouponExhausted);
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at < now {
            return Err(ServiceError::CouponExpired);
        }
    }
    if subtotal < coupon.min_order {
        return Err(ServiceError::CouponMinOrderNotMet);
    }
    Ok(())
}

/// Discount amount a coupon takes off `subtotal`, clamped to `[0, subtotal]`.
///
/// FIXED coupons discount their face value. PERCENT coupons discount
/// `subtotal * value / 100` with integer division, capped at `max_discount`
/// when that cap is non-zero.
pub fn coupon_discount(kind: CouponKind, value: i64, max_discount: i64, subtotal: i64) -> i64 {
    let raw = match kind {
        CouponKind::Fixed => value,
        CouponKind::Percent => {
            let pct = subtotal * value / 100;
            if max_discount > 0 {
                pct.min(max_discount)
            } else {
                pct
            }
        }
    };
    raw.clamp(0, subtotal)
}

/// Points actually redeemed against an order: never more than requested,
/// never more than the balance holds, and never more than the order can
/// absorb at [`POINT_VALUE`] per point. Over-asking clamps silently.
pub fn compute_redemption(requested: i64, available: i64, subtotal: i64) -> i64 {
    let cap = subtotal / POINT_VALUE;
    requested.min(available).min(cap).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn line(unit_price: i64, quantity: i32) -> LineItemSnapshot {
        LineItemSnapshot {
            product_id: 1,
            name: "Tee".to_string(),
            unit_price,
            image: json!({}),
            quantity,
        }
    }

    fn coupon(kind: CouponKind, value: i64, min_order: i64, max_discount: i64) -> coupon::Model {
        coupon::Model {
            id: 1,
            code: "CPTEST".to_string(),
            owner_user_id: 7,
            kind,
            value,
            min_order,
            max_discount,
            expires_at: Some(Utc::now() + Duration::days(7)),
            uses_remaining: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn totals_sum_price_times_quantity() {
        let totals = compute_cart_totals(&[line(150_000, 2), line(80_000, 1)]);
        assert_eq!(totals.subtotal, 380_000);
        assert_eq!(totals.total_quantity, 3);
    }

    #[test]
    fn totals_of_empty_cart_are_zero() {
        let totals = compute_cart_totals(&[]);
        assert_eq!(totals.subtotal, 0);
        assert_eq!(totals.total_quantity, 0);
    }

    #[test]
    fn fixed_discount_is_face_value() {
        assert_eq!(
            coupon_discount(CouponKind::Fixed, 50_000, 0, 300_000),
            50_000
        );
    }

    #[test]
    fn fixed_discount_clamps_to_subtotal() {
        assert_eq!(
            coupon_discount(CouponKind::Fixed, 500_000, 0, 300_000),
            300_000
        );
    }

    #[test]
    fn percent_discount_uses_integer_division() {
        // 10% of 150_001 truncates
        assert_eq!(
            coupon_discount(CouponKind::Percent, 10, 0, 150_001),
            15_000
        );
    }

    #[test]
    fn percent_discount_honors_cap() {
        assert_eq!(
            coupon_discount(CouponKind::Percent, 50, 40_000, 300_000),
            40_000
        );
        // cap of zero means uncapped
        assert_eq!(
            coupon_discount(CouponKind::Percent, 50, 0, 300_000),
            150_000
        );
    }

    #[test]
    fn validate_runs_checks_in_order() {
        let now = Utc::now();

        let c = coupon(CouponKind::Fixed, 10_000, 0, 0);
        assert!(matches!(
            validate_coupon(&c, 99, 300_000, now),
            Err(ServiceError::NotFound(_))
        ));

        let mut c = coupon(CouponKind::Fixed, 10_000, 0, 0);
        c.uses_remaining = 0;
        // exhausted wins over expired even when both hold
        c.expires_at = Some(now - Duration::days(1));
        assert!(matches!(
            validate_coupon(&c, 7, 300_000, now),
            Err(ServiceError::CouponExhausted)
        ));

        let mut c = coupon(CouponKind::Fixed, 10_000, 0, 0);
        c.expires_at = Some(now - Duration::hours(1));
        assert!(matches!(
            validate_coupon(&c, 7, 300_000, now),
            Err(ServiceError::CouponExpired)
        ));

        let c = coupon(CouponKind::Fixed, 10_000, 500_000, 0);
        assert!(matches!(
            validate_coupon(&c, 7, 300_000, now),
            Err(ServiceError::CouponMinOrderNotMet)
        ));
    }

    #[test]
    fn validate_accepts_coupon_without_expiry() {
        let mut c = coupon(CouponKind::Percent, 10, 0, 0);
        c.expires_at = None;
        assert!(validate_coupon(&c, 7, 100_000, Utc::now()).is_ok());
    }

    #[test]
    fn validate_accepts_subtotal_equal_to_min_order() {
        let c = coupon(CouponKind::Fixed, 10_000, 300_000, 0);
        assert!(validate_coupon(&c, 7, 300_000, Utc::now()).is_ok());
    }

    #[test]
    fn redemption_clamps_to_smallest_bound() {
        // requested wins
        assert_eq!(compute_redemption(3, 100, 100_000), 3);
        // balance wins
        assert_eq!(compute_redemption(50, 20, 100_000), 20);
        // order cap wins: 25_000 / 100 = 250
        assert_eq!(compute_redemption(1_000, 1_000, 25_000), 250);
        // subtotal below one point redeems nothing
        assert_eq!(compute_redemption(5, 5, 99), 0);
    }

    #[test]
    fn redemption_never_negative() {
        assert_eq!(compute_redemption(-10, 100, 100_000), 0);
        assert_eq!(compute_redemption(10, -5, 100_000), 0);
    }
}
