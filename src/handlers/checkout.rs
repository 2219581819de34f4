use crate::auth::AuthenticatedUser;
use crate::handlers::AppState;
use crate::services::checkout::{CartLine, CheckoutQuote, SettlementCommand, SettlementResult};
use crate::errors::ServiceError;
use crate::ApiResponse;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLineRequest {
    /// Product to purchase
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub product_id: Uuid,
    /// Units of the product; must be at least 1
    #[schema(example = 2)]
    pub quantity: u32,
}

impl From<CartLineRequest> for CartLine {
    fn from(req: CartLineRequest) -> Self {
        Self {
            product_id: req.product_id,
            quantity: req.quantity,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "lines": [
        { "product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 2 }
    ],
    "coupon_code": "RWD-A1B2C3D4E5"
}))]
pub struct CreateCheckoutOrderRequest {
    /// Cart contents; prices are never read from the client
    #[validate(length(min = 1, message = "cart must contain at least one line"))]
    pub lines: Vec<CartLineRequest>,
    /// Coupon code to apply, if the user holds one
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "gateway_order_id": "order_NXhT2vYxQ1",
    "payment_id": "pay_NXhUKwF3b7",
    "signature": "a3f1…",
    "lines": [
        { "product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 2 }
    ]
}))]
pub struct VerifyPaymentRequest {
    /// Gateway order the payment settles
    #[validate(length(min = 1, message = "gateway_order_id is required"))]
    pub gateway_order_id: String,
    /// Gateway payment reference; the idempotency key for settlement
    #[validate(length(min = 1, message = "payment_id is required"))]
    pub payment_id: String,
    /// HMAC-SHA256 signature issued by the gateway over order and payment ids
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
    /// Cart contents, re-priced server-side before the order is written
    #[validate(length(min = 1, message = "cart must contain at least one line"))]
    pub lines: Vec<CartLineRequest>,
    /// Coupon code to redeem, if any
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutOrderResponse {
    pub gateway_order_id: String,
    /// Amount to charge, in minor currency units
    pub amount: i64,
    pub currency: String,
    pub applied_coupon_code: Option<String>,
}

impl From<CheckoutQuote> for CheckoutOrderResponse {
    fn from(quote: CheckoutQuote) -> Self {
        Self {
            gateway_order_id: quote.gateway_order_id,
            amount: quote.amount,
            currency: quote.currency,
            applied_coupon_code: quote.applied_coupon_code,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementResponse {
    pub order_id: Uuid,
    /// Settled total, in minor currency units
    pub total_amount: i64,
    /// True when this payment was already settled and the existing order
    /// was returned
    pub replayed: bool,
    /// Reward coupon issued by this settlement, if the total qualified
    pub reward_coupon_code: Option<String>,
}

impl From<SettlementResult> for SettlementResponse {
    fn from(result: SettlementResult) -> Self {
        Self {
            order_id: result.order_id,
            total_amount: result.total_amount,
            replayed: result.replayed,
            reward_coupon_code: result.reward_coupon_code,
        }
    }
}

/// Create a payment order for the cart
#[utoipa::path(
    post,
    path = "/api/v1/checkout/orders",
    request_body = CreateCheckoutOrderRequest,
    responses(
        (status = 201, description = "Payment order created", body = crate::ApiResponse<CheckoutOrderResponse>),
        (status = 422, description = "A cart product could not be resolved", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway rejected the order", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_checkout_order(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<CreateCheckoutOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutOrderResponse>>), ServiceError> {
    request.validate()?;

    let lines = request.lines.into_iter().map(CartLine::from).collect();
    let quote = state
        .services
        .checkout
        .initiate_checkout(user_id, lines, request.coupon_code)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(CheckoutOrderResponse::from(quote))),
    ))
}

/// Verify a payment and settle the order
#[utoipa::path(
    post,
    path = "/api/v1/checkout/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 201, description = "Payment verified and order settled", body = crate::ApiResponse<SettlementResponse>),
        (status = 200, description = "Payment already settled; existing order returned", body = crate::ApiResponse<SettlementResponse>),
        (status = 401, description = "Payment signature invalid", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent settlement won the race; safe to retry", body = crate::errors::ErrorResponse),
        (status = 422, description = "A cart product could not be resolved", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SettlementResponse>>), ServiceError> {
    request.validate()?;

    let command = SettlementCommand {
        gateway_order_id: request.gateway_order_id,
        payment_id: request.payment_id,
        signature: request.signature,
        lines: request.lines.into_iter().map(CartLine::from).collect(),
        coupon_code: request.coupon_code,
    };

    let result = state
        .services
        .checkout
        .settle_payment(user_id, command)
        .await?;

    let status = if result.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(ApiResponse::success(SettlementResponse::from(result))),
    ))
}

/// Checkout routes
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", post(create_checkout_order))
        .route("/verify", post(verify_payment))
}
