use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as Order},
        order_item::{self, Entity as OrderItem},
    },
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read side of the order store. Orders are written exclusively by the
/// settlement transaction in the checkout service; this service only queries.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Idempotency lookup by the gateway payment reference. Exposed on an
    /// arbitrary connection so settlement can run it inside its transaction.
    pub async fn find_by_payment_reference_on<C: ConnectionTrait>(
        conn: &C,
        payment_reference_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        let found = Order::find()
            .filter(order::Column::PaymentReferenceId.eq(payment_reference_id))
            .one(conn)
            .await?;
        Ok(found)
    }

    #[instrument(skip(self))]
    pub async fn find_by_payment_reference(
        &self,
        payment_reference_id: &str,
    ) -> Result<Option<order::Model>, ServiceError> {
        Self::find_by_payment_reference_on(&*self.db, payment_reference_id).await
    }

    /// Fetch an order with its line items, enforcing ownership.
    #[instrument(skip(self))]
    pub async fn get_for_user(
        &self,
        order_id: Uuid,
        user_id: Uuid,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .all(&*self.db)
            .await?;

        Ok((order, items))
    }

    /// The authenticated user's order history, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }
}
