use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the checkout and settlement flow.
///
/// Every event is emitted after its transaction commits; consumers never see
/// state that was later rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CheckoutInitiated {
        user_id: Uuid,
        gateway_order_id: String,
        amount: i64,
    },
    OrderSettled {
        order_id: Uuid,
        user_id: Uuid,
        total_amount: i64,
    },
    SettlementReplayed {
        order_id: Uuid,
        payment_reference_id: String,
    },
    CouponRedeemed {
        user_id: Uuid,
        code: String,
    },
    RewardCouponIssued {
        user_id: Uuid,
        code: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; delivery is best-effort and never fails the caller.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Event channel closed, dropping event: {}", e);
        }
    }
}

/// Consumes events from the channel and logs them. Downstream integrations
/// (notifications, analytics export) would hook in here.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::CheckoutInitiated {
                user_id,
                gateway_order_id,
                amount,
            } => {
                info!(
                    user_id = %user_id,
                    gateway_order_id = %gateway_order_id,
                    amount = amount,
                    "Checkout initiated"
                );
            }
            Event::OrderSettled {
                order_id,
                user_id,
                total_amount,
            } => {
                info!(
                    order_id = %order_id,
                    user_id = %user_id,
                    total_amount = total_amount,
                    "Order settled"
                );
            }
            Event::SettlementReplayed {
                order_id,
                payment_reference_id,
            } => {
                info!(
                    order_id = %order_id,
                    payment_reference_id = %payment_reference_id,
                    "Duplicate settlement attempt replayed"
                );
            }
            Event::CouponRedeemed { user_id, code } => {
                info!(user_id = %user_id, code = %code, "Coupon redeemed");
            }
            Event::RewardCouponIssued { user_id, code } => {
                info!(user_id = %user_id, code = %code, "Reward coupon issued");
            }
        }
    }

    info!("Event processing loop stopped");
}
