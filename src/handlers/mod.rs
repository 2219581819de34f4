pub mod checkout;
pub mod common;
pub mod coupons;
pub mod orders;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::services::{CatalogService, CheckoutService, CouponService, OrderService};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub coupons: Arc<CouponService>,
    pub orders: Arc<OrderService>,
    pub checkout: Arc<CheckoutService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        currency: String,
    ) -> Self {
        let catalog = Arc::new(CatalogService::new(db.clone()));
        let coupons = Arc::new(CouponService::new(db.clone()));
        let orders = Arc::new(OrderService::new(db.clone()));
        let checkout = Arc::new(CheckoutService::new(db, gateway, event_sender, currency));

        Self {
            catalog,
            coupons,
            orders,
            checkout,
        }
    }
}
