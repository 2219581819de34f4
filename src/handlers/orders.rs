use super::common::{PaginatedResponse, PaginationParams};
use crate::auth::AuthenticatedUser;
use crate::entities::{order, order_item};
use crate::handlers::AppState;
use crate::{ApiResponse, ApiResult};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub status: String,
    /// All amounts in minor currency units
    pub subtotal: i64,
    pub discount: i64,
    pub total_amount: i64,
    pub currency: String,
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<order::Model> for OrderResponse {
    fn from(model: order::Model) -> Self {
        Self {
            id: model.id,
            order_number: model.order_number,
            status: model.status,
            subtotal: model.subtotal,
            discount: model.discount,
            total_amount: model.total_amount,
            currency: model.currency,
            coupon_code: model.coupon_code,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(model: order_item::Model) -> Self {
        Self {
            product_id: model.product_id,
            sku: model.sku,
            name: model.name,
            quantity: model.quantity,
            unit_price: model.unit_price,
            line_total: model.line_total,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub items: Vec<OrderItemResponse>,
}

/// List the authenticated user's orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "Order history, newest first", body = crate::ApiResponse<PaginatedResponse<OrderResponse>>),
        (status = 401, description = "Missing or invalid bearer token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<OrderResponse>> {
    let (orders, total) = state
        .services
        .orders
        .list_for_user(user_id, params.page, params.per_page)
        .await?;

    let data = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        data,
        params.page,
        params.per_page,
        total,
    ))))
}

/// Get one of the authenticated user's orders with its line items
#[utoipa::path(
    get,
    path = "/api/v1/orders/:order_id",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order found", body = crate::ApiResponse<OrderDetailResponse>),
        (status = 404, description = "Order not found or owned by another user", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<OrderDetailResponse> {
    let (order, items) = state.services.orders.get_for_user(order_id, user_id).await?;

    Ok(Json(ApiResponse::success(OrderDetailResponse {
        order: OrderResponse::from(order),
        items: items.into_iter().map(OrderItemResponse::from).collect(),
    })))
}

/// Order routes
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:order_id", get(get_order))
}
