mod common;

use axum::http::{Method, StatusCode};
use common::{mint_token, response_json, TestApp, TEST_JWT_SECRET};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn checkout_requires_a_bearer_token() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("SHIRT", 500).await;

    let body = json!({
        "lines": [{ "product_id": shirt.id, "quantity": 1 }]
    });
    let response = app
        .request(Method::POST, "/api/v1/checkout/orders", Some(body), None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn checkout_order_returns_the_server_priced_amount() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("SHIRT", 500).await;
    let shoes = app.seed_product("SHOES", 1500).await;

    let body = json!({
        "lines": [
            { "product_id": shirt.id, "quantity": 2 },
            { "product_id": shoes.id, "quantity": 1 }
        ]
    });
    let response = app
        .request_authenticated(Method::POST, "/api/v1/checkout/orders", Some(body))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = response_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["amount"], 2500);
    assert_eq!(json["data"]["currency"], "INR");
    assert!(json["data"]["gateway_order_id"]
        .as_str()
        .unwrap()
        .starts_with("order_test_"));
}

#[tokio::test]
async fn empty_carts_are_rejected() {
    let app = TestApp::new().await;

    let body = json!({ "lines": [] });
    let response = app
        .request_authenticated(Method::POST, "/api/v1/checkout/orders", Some(body))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_products_yield_unprocessable_entity() {
    let app = TestApp::new().await;

    let body = json!({
        "lines": [{ "product_id": Uuid::new_v4(), "quantity": 1 }]
    });
    let response = app
        .request_authenticated(Method::POST, "/api/v1/checkout/orders", Some(body))
        .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = response_json(response).await;
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("could not be resolved"));
}

#[tokio::test]
async fn forged_signatures_are_unauthorized() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("SHIRT", 500).await;

    let body = json!({
        "gateway_order_id": "order_g1",
        "payment_id": "pay_1",
        "signature": "deadbeef",
        "lines": [{ "product_id": shirt.id, "quantity": 1 }]
    });
    let response = app
        .request_authenticated(Method::POST, "/api/v1/checkout/verify", Some(body))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = response_json(response).await;
    assert_eq!(json["message"], "Invalid payment signature");
}

#[tokio::test]
async fn verify_settles_then_replays_idempotently() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("SHIRT", 500).await;

    let body = json!({
        "gateway_order_id": "order_g1",
        "payment_id": "pay_1",
        "signature": app.gateway.sign("order_g1", "pay_1"),
        "lines": [{ "product_id": shirt.id, "quantity": 2 }]
    });

    let first = app
        .request_authenticated(Method::POST, "/api/v1/checkout/verify", Some(body.clone()))
        .await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let first_json = response_json(first).await;
    assert_eq!(first_json["data"]["replayed"], false);
    assert_eq!(first_json["data"]["total_amount"], 1000);
    let order_id = first_json["data"]["order_id"].as_str().unwrap().to_string();

    let second = app
        .request_authenticated(Method::POST, "/api/v1/checkout/verify", Some(body))
        .await;
    assert_eq!(second.status(), StatusCode::OK);
    let second_json = response_json(second).await;
    assert_eq!(second_json["data"]["replayed"], true);
    assert_eq!(second_json["data"]["order_id"].as_str().unwrap(), order_id);
}

#[tokio::test]
async fn settled_orders_appear_in_the_users_history() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("SHIRT", 500).await;

    let body = json!({
        "gateway_order_id": "order_g1",
        "payment_id": "pay_1",
        "signature": app.gateway.sign("order_g1", "pay_1"),
        "lines": [{ "product_id": shirt.id, "quantity": 2 }]
    });
    let settled = app
        .request_authenticated(Method::POST, "/api/v1/checkout/verify", Some(body))
        .await;
    assert_eq!(settled.status(), StatusCode::CREATED);
    let settled_json = response_json(settled).await;
    let order_id = settled_json["data"]["order_id"].as_str().unwrap().to_string();

    // List endpoint.
    let list = app
        .request_authenticated(Method::GET, "/api/v1/orders", None)
        .await;
    assert_eq!(list.status(), StatusCode::OK);
    let list_json = response_json(list).await;
    assert_eq!(list_json["data"]["pagination"]["total"], 1);
    assert_eq!(list_json["data"]["data"][0]["id"].as_str().unwrap(), order_id);
    assert_eq!(list_json["data"]["data"][0]["status"], "paid");

    // Detail endpoint with line items.
    let detail = app
        .request_authenticated(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    assert_eq!(detail.status(), StatusCode::OK);
    let detail_json = response_json(detail).await;
    assert_eq!(detail_json["data"]["total_amount"], 1000);
    assert_eq!(detail_json["data"]["items"][0]["quantity"], 2);
    assert_eq!(detail_json["data"]["items"][0]["unit_price"], 500);

    // Another user cannot see it.
    let other_token = mint_token(Uuid::new_v4(), TEST_JWT_SECRET);
    let foreign = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{}", order_id),
            None,
            Some(&other_token),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reward_coupon_is_visible_after_a_qualifying_settlement() {
    let app = TestApp::new().await;
    let tv = app.seed_product("TV", 2_000_000).await;

    let body = json!({
        "gateway_order_id": "order_g1",
        "payment_id": "pay_1",
        "signature": app.gateway.sign("order_g1", "pay_1"),
        "lines": [{ "product_id": tv.id, "quantity": 1 }]
    });
    let settled = app
        .request_authenticated(Method::POST, "/api/v1/checkout/verify", Some(body))
        .await;
    assert_eq!(settled.status(), StatusCode::CREATED);
    let settled_json = response_json(settled).await;
    let code = settled_json["data"]["reward_coupon_code"]
        .as_str()
        .expect("reward issued")
        .to_string();

    let active = app
        .request_authenticated(Method::GET, "/api/v1/coupons/active", None)
        .await;
    assert_eq!(active.status(), StatusCode::OK);
    let active_json = response_json(active).await;
    assert_eq!(active_json["data"]["code"].as_str().unwrap(), code);
    assert_eq!(active_json["data"]["discount_percentage"], 10);
}

#[tokio::test]
async fn products_are_browsable_without_auth() {
    let app = TestApp::new().await;
    let shirt = app.seed_product("SHIRT", 500).await;

    let list = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(list.status(), StatusCode::OK);
    let list_json = response_json(list).await;
    assert_eq!(list_json["data"]["pagination"]["total"], 1);
    assert_eq!(list_json["data"]["data"][0]["sku"], "SHIRT");
    assert_eq!(list_json["data"]["data"][0]["price"], 500);

    let detail = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", shirt.id),
            None,
            None,
        )
        .await;
    assert_eq!(detail.status(), StatusCode::OK);

    let missing = app
        .request(
            Method::GET,
            &format!("/api/v1/products/{}", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_and_health_endpoints_respond() {
    let app = TestApp::new().await;

    let status = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status.status(), StatusCode::OK);
    let status_json = response_json(status).await;
    assert_eq!(status_json["data"]["service"], "storefront-api");

    let health = app.request(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
    let health_json = response_json(health).await;
    assert_eq!(health_json["data"]["checks"]["database"], "healthy");

    let openapi = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(openapi.status(), StatusCode::OK);
}
