use crate::{
    db::DbPool,
    entities::coupon::{self, Entity as Coupon},
    errors::ServiceError,
};
use chrono::{Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Reward coupons issued after a qualifying settlement: fixed 10% discount,
/// 30-day validity, `RWD-` prefixed promotional code.
pub const REWARD_DISCOUNT_PERCENTAGE: i16 = 10;
pub const REWARD_VALIDITY_DAYS: i64 = 30;
const REWARD_CODE_PREFIX: &str = "RWD-";
const REWARD_CODE_SUFFIX_LEN: usize = 10;

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Find an active, unexpired coupon scoped to `(code, user_id)` on an
    /// arbitrary connection. A coupon owned by a different user is invisible
    /// here, which is what makes foreign codes silently ineffective.
    pub async fn find_active_on<C: ConnectionTrait>(
        conn: &C,
        code: &str,
        user_id: Uuid,
    ) -> Result<Option<coupon::Model>, ServiceError> {
        let now = Utc::now();
        let found = Coupon::find()
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::UserId.eq(user_id))
            .filter(coupon::Column::IsActive.eq(true))
            .filter(coupon::Column::ExpiresAt.gt(now))
            .one(conn)
            .await?;

        if found.is_none() {
            debug!(code = %code, user_id = %user_id, "No active coupon matched");
        }
        Ok(found)
    }

    #[instrument(skip(self))]
    pub async fn find_active(
        &self,
        code: &str,
        user_id: Uuid,
    ) -> Result<Option<coupon::Model>, ServiceError> {
        Self::find_active_on(&*self.db, code, user_id).await
    }

    /// The user's currently active coupon, if any. At most one exists.
    #[instrument(skip(self))]
    pub async fn active_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<coupon::Model>, ServiceError> {
        let now = Utc::now();
        let found = Coupon::find()
            .filter(coupon::Column::UserId.eq(user_id))
            .filter(coupon::Column::IsActive.eq(true))
            .filter(coupon::Column::ExpiresAt.gt(now))
            .one(&*self.db)
            .await?;
        Ok(found)
    }

    /// Deactivate a redeemed coupon. Runs on the settlement transaction so a
    /// later abort also reverses the deactivation.
    pub async fn deactivate_on<C: ConnectionTrait>(
        conn: &C,
        coupon: coupon::Model,
    ) -> Result<(), ServiceError> {
        let mut active: coupon::ActiveModel = coupon.into();
        active.is_active = Set(false);
        active.update(conn).await?;
        Ok(())
    }

    /// Issue a reward coupon: delete any prior coupon the user owns, then
    /// insert a fresh active one. Delete-then-insert keeps the
    /// one-active-coupon-per-user invariant under the same transaction as
    /// the order write.
    pub async fn issue_reward_on<C: ConnectionTrait>(
        conn: &C,
        user_id: Uuid,
    ) -> Result<coupon::Model, ServiceError> {
        Coupon::delete_many()
            .filter(coupon::Column::UserId.eq(user_id))
            .exec(conn)
            .await?;

        let now = Utc::now();
        let reward = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(generate_reward_code()),
            user_id: Set(user_id),
            discount_percentage: Set(REWARD_DISCOUNT_PERCENTAGE),
            is_active: Set(true),
            expires_at: Set(now + Duration::days(REWARD_VALIDITY_DAYS)),
            created_at: Set(now),
        };

        let inserted = reward.insert(conn).await?;
        Ok(inserted)
    }
}

/// Best-effort-unique promotional code. Codes are only ever matched together
/// with the owning user id, so a cross-user collision has no effect; no
/// collision-retry loop is needed.
pub fn generate_reward_code() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REWARD_CODE_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("{}{}", REWARD_CODE_PREFIX, suffix.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reward_codes_carry_prefix_and_length() {
        let code = generate_reward_code();
        assert!(code.starts_with(REWARD_CODE_PREFIX));
        assert_eq!(code.len(), REWARD_CODE_PREFIX.len() + REWARD_CODE_SUFFIX_LEN);
        assert!(code[REWARD_CODE_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn reward_codes_vary() {
        let a = generate_reward_code();
        let b = generate_reward_code();
        assert_ne!(a, b);
    }
}
