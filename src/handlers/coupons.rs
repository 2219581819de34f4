use crate::auth::AuthenticatedUser;
use crate::entities::coupon;
use crate::handlers::AppState;
use crate::{ApiResponse, ApiResult};
use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponResponse {
    pub code: String,
    pub discount_percentage: i16,
    pub expires_at: DateTime<Utc>,
}

impl From<coupon::Model> for CouponResponse {
    fn from(model: coupon::Model) -> Self {
        Self {
            code: model.code,
            discount_percentage: model.discount_percentage,
            expires_at: model.expires_at,
        }
    }
}

/// Get the authenticated user's active coupon
#[utoipa::path(
    get,
    path = "/api/v1/coupons/active",
    responses(
        (status = 200, description = "Active coupon, or null when the user holds none", body = crate::ApiResponse<Option<CouponResponse>>),
        (status = 401, description = "Missing or invalid bearer token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Coupons"
)]
pub async fn get_active_coupon(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> ApiResult<Option<CouponResponse>> {
    let coupon = state.services.coupons.active_for_user(user_id).await?;
    Ok(Json(ApiResponse::success(
        coupon.map(CouponResponse::from),
    )))
}

/// Coupon routes
pub fn coupon_routes() -> Router<AppState> {
    Router::new().route("/active", get(get_active_coupon))
}
