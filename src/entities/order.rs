use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A settled order. Written exactly once per successful verified payment;
/// `payment_reference_id` carries a unique index and is the idempotency key
/// that makes duplicate settlement attempts harmless.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    /// All amounts are in the smallest currency unit.
    pub subtotal: i64,
    pub discount: i64,
    pub total_amount: i64,
    pub currency: String,
    pub coupon_code: Option<String>,
    /// Gateway-side order reference issued at checkout initiation.
    pub payment_order_id: String,
    /// Gateway-side payment reference; unique across all orders.
    #[sea_orm(unique)]
    pub payment_reference_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Status written at settlement. Later fulfillment transitions belong to a
/// workflow outside this service and never touch these rows.
pub const STATUS_PAID: &str = "paid";
