pub mod catalog;
pub mod checkout;
pub mod coupons;
pub mod orders;

pub use catalog::CatalogService;
pub use checkout::CheckoutService;
pub use coupons::CouponService;
pub use orders::OrderService;
