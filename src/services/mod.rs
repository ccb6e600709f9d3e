pub mod carts;
pub mod catalog;
pub mod coupons;
pub mod orders;
pub mod pricing;
pub mod promotion_ledger;
pub mod reviews;

pub use carts::CartService;
pub use catalog::CatalogService;
pub use coupons::CouponService;
pub use orders::OrderService;
pub use promotion_ledger::PromotionLedgerService;
pub use reviews::ReviewService;
