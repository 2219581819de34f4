use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = r#"
# Storefront API

Storefront backend with a payment-gateway checkout flow.

All prices and amounts are integers in the smallest currency unit. The
server recomputes every total from the catalog; amounts sent by clients
are never trusted.

## Authentication

Checkout, order, and coupon endpoints require a JWT bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Checkout flow

1. `POST /api/v1/checkout/orders` prices the cart and creates a payment
   order with the gateway.
2. The client completes payment with the gateway out-of-band.
3. `POST /api/v1/checkout/verify` checks the gateway's HMAC signature and
   settles the order atomically. The call is idempotent on the payment id.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Checkout", description = "Checkout and payment verification endpoints"),
        (name = "Orders", description = "Order history endpoints"),
        (name = "Coupons", description = "Coupon endpoints")
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::checkout::create_checkout_order,
        crate::handlers::checkout::verify_payment,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::coupons::get_active_coupon,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,

            crate::handlers::products::ProductResponse,

            crate::handlers::checkout::CartLineRequest,
            crate::handlers::checkout::CreateCheckoutOrderRequest,
            crate::handlers::checkout::VerifyPaymentRequest,
            crate::handlers::checkout::CheckoutOrderResponse,
            crate::handlers::checkout::SettlementResponse,

            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::OrderDetailResponse,

            crate::handlers::coupons::CouponResponse,

            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/checkout/verify"));
        assert!(json.contains("bearer_auth"));
    }
}
