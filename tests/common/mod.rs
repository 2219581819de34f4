#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth::Claims,
    config::{AppConfig, GatewayConfig},
    db,
    entities::{coupon, product, product::ProductStatus},
    events::{self, EventSender},
    gateway::{self, GatewayError, GatewayOrder, PaymentGateway},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_GATEWAY_SECRET: &str = "gateway_shared_secret_for_tests";

/// Payment gateway double: deterministic order ids, real HMAC signatures
/// over the shared test secret, and a switch to simulate gateway outages.
pub struct FakeGateway {
    secret: String,
    fail_orders: AtomicBool,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            secret: TEST_GATEWAY_SECRET.to_string(),
            fail_orders: AtomicBool::new(false),
        }
    }

    pub fn fail_order_creation(&self) {
        self.fail_orders.store(true, Ordering::SeqCst);
    }

    /// Sign a payment the way the real gateway would.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        gateway::compute_signature(&self.secret, order_id, payment_id)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        _receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(GatewayError::Rejected {
                status: 503,
                body: "gateway unavailable".to_string(),
            });
        }
        Ok(GatewayOrder {
            id: format!("order_test_{}", Uuid::new_v4().simple()),
            amount,
            currency: currency.to_string(),
        })
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        gateway::verify_signature(&self.secret, order_id, payment_id, signature)
    }
}

/// Helper harness for spinning up an application backed by an in-memory
/// SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<FakeGateway>,
    pub user_id: Uuid,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "info".to_string(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        gateway: GatewayConfig {
            base_url: "http://127.0.0.1:0".to_string(),
            key_id: "key_test".to_string(),
            key_secret: TEST_GATEWAY_SECRET.to_string(),
            currency: "INR".to_string(),
            timeout_secs: 2,
        },
    }
}

/// Mint a bearer token the way the identity service would.
pub fn mint_token(user_id: Uuid, secret: &str) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(1)).timestamp(),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode access token")
}

impl TestApp {
    /// Construct a new test application with fresh database state. The
    /// single-connection in-memory SQLite pool keeps each harness isolated.
    pub async fn new() -> Self {
        let cfg = test_config();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let fake_gateway = Arc::new(FakeGateway::new());
        let gateway: Arc<dyn PaymentGateway> = fake_gateway.clone();

        let services = AppServices::new(
            db_arc.clone(),
            gateway,
            event_sender.clone(),
            cfg.gateway.currency.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let router = Router::new()
            .merge(storefront_api::app_routes())
            .with_state(state.clone());

        let user_id = Uuid::new_v4();
        let token = mint_token(user_id, &cfg.jwt_secret);

        Self {
            router,
            state,
            gateway: fake_gateway,
            user_id,
            token,
            _event_task: event_task,
        }
    }

    /// Access the bearer token for the default test user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Insert a catalog product priced in minor units.
    pub async fn seed_product(&self, sku: &str, price: i64) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(format!("Test Product {}", sku)),
            description: Set(None),
            price: Set(price),
            currency: Set("INR".to_string()),
            stock_quantity: Set(100),
            category: Set(None),
            status: Set(ProductStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product for tests")
    }

    /// Insert an active coupon owned by `user_id`.
    pub async fn seed_coupon(
        &self,
        user_id: Uuid,
        code: &str,
        discount_percentage: i16,
    ) -> coupon::Model {
        let now = Utc::now();
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            user_id: Set(user_id),
            discount_percentage: Set(discount_percentage),
            is_active: Set(true),
            expires_at: Set(now + Duration::days(7)),
            created_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed coupon for tests")
    }

    /// Insert a coupon that has already expired.
    pub async fn seed_expired_coupon(&self, user_id: Uuid, code: &str) -> coupon::Model {
        let now = Utc::now();
        coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code.to_string()),
            user_id: Set(user_id),
            discount_percentage: Set(10),
            is_active: Set(true),
            expires_at: Set(now - Duration::days(1)),
            created_at: Set(now - Duration::days(31)),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed expired coupon for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read a JSON body from a response.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is valid json")
}
