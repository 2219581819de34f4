//! Payment-gateway client.
//!
//! The gateway is an untrusted boundary: it creates payment orders on our
//! behalf and signs completed payments with a shared secret. Everything the
//! client reports about a payment is ignored until the signature over
//! `"{order_id}|{payment_id}"` checks out.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, instrument};

use crate::config::GatewayConfig;

type HmacSha256 = Hmac<Sha256>;

/// Order created on the gateway side. A created-but-unpaid gateway order is
/// acceptable and simply expires there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway rejected order creation: status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Seam between the checkout core and the payment provider. Constructed once
/// at startup from configuration and injected, so tests substitute a fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment order for `amount` (smallest currency unit).
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError>;

    /// Verify the gateway's signature over a completed payment.
    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Compute the hex HMAC-SHA256 signature the gateway issues for a payment.
pub fn compute_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a supplied signature against the expected HMAC, in constant time.
pub fn verify_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let expected = compute_signature(secret, order_id, payment_id);
    constant_time_eq(&expected, signature)
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

/// HTTP client for the real payment gateway.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(cfg: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            key_id: cfg.key_id.clone(),
            key_secret: cfg.key_secret.clone(),
        })
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct CreateOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self), fields(amount = amount, currency = currency))]
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayError> {
        let url = format!("{}/v1/orders", self.base_url);
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&CreateOrderRequest {
                amount,
                currency,
                receipt,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Gateway rejected order creation");
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let created: CreateOrderResponse = response.json().await?;
        Ok(GatewayOrder {
            id: created.id,
            amount: created.amount,
            currency: created.currency,
        })
    }

    fn verify_payment_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_signature(&self.key_secret, order_id, payment_id, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "gateway_shared_secret_for_tests";

    #[test]
    fn signature_round_trips() {
        let sig = compute_signature(SECRET, "order_abc", "pay_xyz");
        assert!(verify_signature(SECRET, "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn tampered_ids_fail_verification() {
        let sig = compute_signature(SECRET, "order_abc", "pay_xyz");
        assert!(!verify_signature(SECRET, "order_abc", "pay_other", &sig));
        assert!(!verify_signature(SECRET, "order_other", "pay_xyz", &sig));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let sig = compute_signature(SECRET, "order_abc", "pay_xyz");
        assert!(!verify_signature("another_secret", "order_abc", "pay_xyz", &sig));
    }

    #[test]
    fn truncated_signature_fails_verification() {
        let sig = compute_signature(SECRET, "order_abc", "pay_xyz");
        assert!(!verify_signature(SECRET, "order_abc", "pay_xyz", &sig[..10]));
        assert!(!verify_signature(SECRET, "order_abc", "pay_xyz", ""));
    }
}
