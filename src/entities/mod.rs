pub mod cart;
pub mod coupon;
pub mod coupon_template;
pub mod order;
pub mod product;
pub mod promotion_balance;
pub mod review;
