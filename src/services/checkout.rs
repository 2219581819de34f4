//! Checkout core: trusted pricing, payment-order initiation, and the
//! settlement state machine.
//!
//! Settlement runs entirely inside one database transaction: idempotency
//! lookup, product re-resolution, order insert, coupon consumption, and
//! reward issuance either all commit or none do. The signature check happens
//! before the transaction is even opened, so no attacker-controlled payload
//! influences a read or write until it has been authenticated.

use crate::{
    db::DbPool,
    entities::{
        order::{self, STATUS_PAID},
        order_item, product,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::PaymentGateway,
    services::{catalog::CatalogService, coupons::CouponService, orders::OrderService},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseTransaction, Set, SqlErr, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Currency exponent: minor units per major unit.
pub const MINOR_UNITS_PER_MAJOR: i64 = 100;

/// Settling an order of at least this many major units earns a reward coupon.
pub const REWARD_THRESHOLD_MAJOR: i64 = 20_000;

const REWARD_THRESHOLD_MINOR: i64 = REWARD_THRESHOLD_MAJOR * MINOR_UNITS_PER_MAJOR;

/// A client-supplied cart line. Untrusted: it carries no price, and the
/// quantity is validated before any pricing happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// A cart line priced from the catalog, ready to snapshot into an order.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

/// Result of checkout initiation, handed to the client so it can complete
/// payment with the gateway out-of-band.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutQuote {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub applied_coupon_code: Option<String>,
}

/// Everything the client returns after completing payment with the gateway.
#[derive(Debug, Clone)]
pub struct SettlementCommand {
    pub gateway_order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub lines: Vec<CartLine>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SettlementResult {
    pub order_id: Uuid,
    pub total_amount: i64,
    /// True when an order for this payment reference already existed and the
    /// call committed as a no-op.
    pub replayed: bool,
    pub reward_coupon_code: Option<String>,
}

struct SettlementOutcome {
    order_id: Uuid,
    total_amount: i64,
    replayed: bool,
    payment_reference_id: String,
    redeemed_coupon_code: Option<String>,
    reward_coupon_code: Option<String>,
}

#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: EventSender,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
        currency: String,
    ) -> Self {
        Self {
            db,
            gateway,
            event_sender,
            currency,
        }
    }

    /// Recompute the authoritative total for the cart and create a payment
    /// order with the gateway. Writes no local state; a created-but-unpaid
    /// gateway order simply expires on the gateway side.
    #[instrument(skip(self, lines, coupon_code), fields(user_id = %user_id))]
    pub async fn initiate_checkout(
        &self,
        user_id: Uuid,
        lines: Vec<CartLine>,
        coupon_code: Option<String>,
    ) -> Result<CheckoutQuote, ServiceError> {
        validate_lines(&lines)?;

        let ids = distinct_product_ids(&lines);
        let products = CatalogService::find_by_ids_on(&*self.db, &ids).await?;
        let priced = price_cart(&lines, &products)?;
        let subtotal = subtotal_of(&priced)?;

        let coupon = match coupon_code.as_deref() {
            Some(code) => CouponService::find_active_on(&*self.db, code, user_id).await?,
            None => None,
        };
        let discount = coupon
            .as_ref()
            .map(|c| discount_amount(subtotal, c.discount_percentage))
            .unwrap_or(0);
        let total = subtotal - discount;

        let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
        let gateway_order = self
            .gateway
            .create_order(total, &self.currency, &receipt)
            .await
            .map_err(|e| ServiceError::PaymentFailed(e.to_string()))?;

        info!(
            user_id = %user_id,
            gateway_order_id = %gateway_order.id,
            subtotal = subtotal,
            discount = discount,
            total = total,
            "Checkout initiated"
        );
        self.event_sender
            .send(Event::CheckoutInitiated {
                user_id,
                gateway_order_id: gateway_order.id.clone(),
                amount: total,
            })
            .await;

        Ok(CheckoutQuote {
            gateway_order_id: gateway_order.id,
            amount: total,
            currency: self.currency.clone(),
            applied_coupon_code: coupon.map(|c| c.code),
        })
    }

    /// Verify the payment signature and settle the order atomically.
    ///
    /// Safe to retry: the payment reference is the idempotency key, so a
    /// duplicate delivery commits as a no-op and returns the existing order.
    #[instrument(skip(self, command), fields(user_id = %user_id, payment_id = %command.payment_id))]
    pub async fn settle_payment(
        &self,
        user_id: Uuid,
        command: SettlementCommand,
    ) -> Result<SettlementResult, ServiceError> {
        validate_lines(&command.lines)?;

        // Integrity gate: nothing touches the database until the payload is
        // authenticated against the gateway's shared secret.
        if !self.gateway.verify_payment_signature(
            &command.gateway_order_id,
            &command.payment_id,
            &command.signature,
        ) {
            warn!(
                gateway_order_id = %command.gateway_order_id,
                "Rejected settlement with invalid payment signature"
            );
            return Err(ServiceError::InvalidSignature);
        }

        let SettlementCommand {
            gateway_order_id,
            payment_id,
            lines,
            coupon_code,
            ..
        } = command;
        let currency = self.currency.clone();

        let outcome = self
            .db
            .transaction::<_, SettlementOutcome, ServiceError>(move |txn| {
                Box::pin(async move {
                    settle_in_txn(
                        txn,
                        user_id,
                        gateway_order_id,
                        payment_id,
                        lines,
                        coupon_code,
                        currency,
                    )
                    .await
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        if outcome.replayed {
            info!(
                order_id = %outcome.order_id,
                payment_reference_id = %outcome.payment_reference_id,
                "Settlement replayed; returning existing order"
            );
            self.event_sender
                .send(Event::SettlementReplayed {
                    order_id: outcome.order_id,
                    payment_reference_id: outcome.payment_reference_id.clone(),
                })
                .await;
        } else {
            info!(
                order_id = %outcome.order_id,
                total_amount = outcome.total_amount,
                "Settlement committed"
            );
            self.event_sender
                .send(Event::OrderSettled {
                    order_id: outcome.order_id,
                    user_id,
                    total_amount: outcome.total_amount,
                })
                .await;
            if let Some(code) = &outcome.redeemed_coupon_code {
                self.event_sender
                    .send(Event::CouponRedeemed {
                        user_id,
                        code: code.clone(),
                    })
                    .await;
            }
            if let Some(code) = &outcome.reward_coupon_code {
                self.event_sender
                    .send(Event::RewardCouponIssued {
                        user_id,
                        code: code.clone(),
                    })
                    .await;
            }
        }

        Ok(SettlementResult {
            order_id: outcome.order_id,
            total_amount: outcome.total_amount,
            replayed: outcome.replayed,
            reward_coupon_code: outcome.reward_coupon_code,
        })
    }
}

async fn settle_in_txn(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    gateway_order_id: String,
    payment_id: String,
    lines: Vec<CartLine>,
    coupon_code: Option<String>,
    currency: String,
) -> Result<SettlementOutcome, ServiceError> {
    // Idempotency: a client retry or duplicate webhook settles as a no-op.
    if let Some(existing) = OrderService::find_by_payment_reference_on(txn, &payment_id).await? {
        return Ok(SettlementOutcome {
            order_id: existing.id,
            total_amount: existing.total_amount,
            replayed: true,
            payment_reference_id: payment_id,
            redeemed_coupon_code: None,
            reward_coupon_code: None,
        });
    }

    // Re-resolve and re-price inside the transaction; any client-supplied
    // amount is never read.
    let ids = distinct_product_ids(&lines);
    let products = CatalogService::find_by_ids_on(txn, &ids).await?;
    let priced = price_cart(&lines, &products)?;
    let subtotal = subtotal_of(&priced)?;

    let coupon = match coupon_code.as_deref() {
        Some(code) => CouponService::find_active_on(txn, code, user_id).await?,
        None => None,
    };
    let discount = coupon
        .as_ref()
        .map(|c| discount_amount(subtotal, c.discount_percentage))
        .unwrap_or(0);
    let total = subtotal - discount;

    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let order = order::ActiveModel {
        id: Set(order_id),
        order_number: Set(format!(
            "ORD-{}",
            &order_id.simple().to_string()[..8].to_uppercase()
        )),
        user_id: Set(user_id),
        status: Set(STATUS_PAID.to_string()),
        subtotal: Set(subtotal),
        discount: Set(discount),
        total_amount: Set(total),
        currency: Set(currency),
        coupon_code: Set(coupon.as_ref().map(|c| c.code.clone())),
        payment_order_id: Set(gateway_order_id),
        payment_reference_id: Set(payment_id.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    let order = order.insert(txn).await?;

    for line in &priced {
        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            sku: Set(line.sku.clone()),
            name: Set(line.name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(line.line_total),
        }
        .insert(txn)
        .await?;
    }

    let redeemed_coupon_code = match coupon {
        Some(c) => {
            let code = c.code.clone();
            CouponService::deactivate_on(txn, c).await?;
            Some(code)
        }
        None => None,
    };

    let reward_coupon_code = if total >= REWARD_THRESHOLD_MINOR {
        let reward = CouponService::issue_reward_on(txn, user_id).await?;
        Some(reward.code)
    } else {
        None
    };

    Ok(SettlementOutcome {
        order_id: order.id,
        total_amount: total,
        replayed: false,
        payment_reference_id: payment_id,
        redeemed_coupon_code,
        reward_coupon_code,
    })
}

fn unwrap_txn_error(err: TransactionError<ServiceError>) -> ServiceError {
    let service_err = match err {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(e) => e,
    };
    match service_err {
        // A unique-violation on the payment-reference index means a
        // concurrent settlement won the race; the caller can retry and will
        // hit the idempotent-replay path.
        ServiceError::DatabaseError(db_err)
            if matches!(db_err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
        {
            ServiceError::Conflict(
                "an order already exists for this payment reference".to_string(),
            )
        }
        other => other,
    }
}

fn validate_lines(lines: &[CartLine]) -> Result<(), ServiceError> {
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "cart must contain at least one line".to_string(),
        ));
    }
    if lines.iter().any(|l| l.quantity == 0) {
        return Err(ServiceError::ValidationError(
            "cart line quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn distinct_product_ids(lines: &[CartLine]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::new();
    lines
        .iter()
        .map(|l| l.product_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Price every cart line from the catalog records. Every requested product
/// must resolve; a shortfall means tampering, a deleted product, or a stale
/// client cart, and no partial computation is attempted.
pub fn price_cart(
    lines: &[CartLine],
    products: &[product::Model],
) -> Result<Vec<PricedLine>, ServiceError> {
    let requested = distinct_product_ids(lines);
    if products.len() != requested.len() {
        return Err(ServiceError::ProductMismatch(format!(
            "{} of {} requested products could not be resolved",
            requested.len() - products.len(),
            requested.len()
        )));
    }

    let by_id: HashMap<Uuid, &product::Model> = products.iter().map(|p| (p.id, p)).collect();

    lines
        .iter()
        .map(|line| {
            let product = by_id.get(&line.product_id).ok_or_else(|| {
                ServiceError::ProductMismatch(format!(
                    "product {} could not be resolved",
                    line.product_id
                ))
            })?;
            let quantity = i64::from(line.quantity);
            let line_total = product.price.checked_mul(quantity).ok_or_else(|| {
                ServiceError::InvalidInput("cart line total overflows".to_string())
            })?;
            Ok(PricedLine {
                product_id: product.id,
                sku: product.sku.clone(),
                name: product.name.clone(),
                quantity: line.quantity as i32,
                unit_price: product.price,
                line_total,
            })
        })
        .collect()
}

pub fn subtotal_of(priced: &[PricedLine]) -> Result<i64, ServiceError> {
    priced.iter().try_fold(0i64, |acc, line| {
        acc.checked_add(line.line_total)
            .ok_or_else(|| ServiceError::InvalidInput("cart subtotal overflows".to_string()))
    })
}

/// `round(subtotal × percentage / 100)`, round-half-up, in minor units. The
/// i128 intermediate cannot overflow for any i64 subtotal.
pub fn discount_amount(subtotal: i64, percentage: i16) -> i64 {
    let scaled = i128::from(subtotal) * i128::from(percentage);
    ((scaled + 50) / 100) as i64
}
