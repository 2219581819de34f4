use super::common::{PaginatedResponse, PaginationParams};
use crate::entities::product;
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
pub struct ProductResponse {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in minor currency units (e.g. paise).
    pub price: i64,
    pub currency: String,
    pub stock_quantity: i32,
    pub category: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            sku: model.sku,
            name: model.name,
            description: model.description,
            price: model.price,
            currency: model.currency,
            stock_quantity: model.stock_quantity,
            category: model.category,
            status: model.status.as_str().to_string(),
            created_at: model.created_at,
        }
    }
}

/// List active products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Active products", body = crate::ApiResponse<PaginatedResponse<ProductResponse>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> ApiResult<PaginatedResponse<ProductResponse>> {
    let (products, total) = state
        .services
        .catalog
        .list_active(params.page, params.per_page)
        .await?;

    let data = products.into_iter().map(ProductResponse::from).collect();
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        data,
        params.page,
        params.per_page,
        total,
    ))))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/:product_id",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product found", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> ApiResult<ProductResponse> {
    let product = state.services.catalog.get(product_id).await?;
    Ok(Json(ApiResponse::success(ProductResponse::from(product))))
}

/// Product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/:product_id", get(get_product))
}
