pub mod carts;
pub mod common;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod promotions;
pub mod reviews;
