use crate::{
    db::DbPool,
    entities::product::{self, Entity as Product, ProductStatus},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Read side of the product catalog. The checkout core treats this store as
/// the single authoritative source of prices; nothing here mutates it.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Fetch products by id on an arbitrary connection, so the settlement
    /// transaction can re-resolve the cart against the same snapshot it
    /// writes the order under.
    pub async fn find_by_ids_on<C: ConnectionTrait>(
        conn: &C,
        ids: &[Uuid],
    ) -> Result<Vec<product::Model>, ServiceError> {
        let products = Product::find()
            .filter(product::Column::Id.is_in(ids.iter().copied()))
            .all(conn)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<product::Model>, ServiceError> {
        Self::find_by_ids_on(&*self.db, ids).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Paginated listing of active products for storefront browsing.
    #[instrument(skip(self))]
    pub async fn list_active(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let paginator = Product::find()
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }
}
