use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discount coupon scoped to a single user.
///
/// Invariant: at most one active coupon per user. The reward-issuance policy
/// enforces it with delete-then-insert inside the settlement transaction, and
/// the store backs it up with a partial unique index on `(user_id)` where
/// `is_active` (see the migrator).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub code: String,
    pub user_id: Uuid,
    /// Whole-percent discount, 0-100.
    pub discount_percentage: i16,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
