pub mod coupon;
pub mod order;
pub mod order_item;
pub mod product;

pub use coupon::Entity as Coupon;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
