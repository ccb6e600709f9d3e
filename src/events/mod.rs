use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events published by the services after their transactions commit.
/// Consumers (the notification fan-out, dashboards) subscribe to the channel;
/// publishing is fire-and-forget and never blocks or fails a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: i64,
        user_id: i64,
        total: i64,
    },
    OrderStatusChanged {
        order_id: i64,
        old_status: String,
        new_status: String,
    },
    OrderCancelRequested {
        order_id: i64,
        user_id: i64,
    },
    CouponMinted {
        coupon_id: i64,
        user_id: i64,
        cost_points: i64,
    },
    PointsAdjusted {
        user_id: i64,
        delta: i64,
    },
    ReviewSubmitted {
        review_id: i64,
        product_id: i64,
        user_id: i64,
    },
    CartUpdated {
        cart_id: i64,
        user_id: i64,
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

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publish without surfacing errors to the caller. Used on the order
    /// critical path where notification failure must not fail the request.
    pub async fn publish_best_effort(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropped event");
        }
    }
}

/// Processes incoming events. The real-time notification service consumes the
/// same stream out of process; here we log each event for traceability.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::OrderCreated {
                order_id,
                user_id,
                total,
            } => {
                info!(
                    order_id = order_id,
                    user_id = user_id,
                    total = total,
                    "notification:new_order"
                );
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(
                    order_id = order_id,
                    old_status = %old_status,
                    new_status = %new_status,
                    "Order status changed"
                );
            }
            Event::OrderCancelRequested { order_id, user_id } => {
                info!(order_id = order_id, user_id = user_id, "Cancel requested");
            }
            Event::CouponMinted {
                coupon_id,
                user_id,
                cost_points,
            } => {
                info!(
                    coupon_id = coupon_id,
                    user_id = user_id,
                    cost_points = cost_points,
                    "Coupon minted"
                );
            }
            Event::PointsAdjusted { user_id, delta } => {
                info!(user_id = user_id, delta = delta, "Points adjusted");
            }
            Event::ReviewSubmitted {
                review_id,
                product_id,
                user_id,
            } => {
                info!(
                    review_id = review_id,
                    product_id = product_id,
                    user_id = user_id,
                    "Review submitted"
                );
            }
            Event::CartUpdated { cart_id, user_id } => {
                info!(cart_id = cart_id, user_id = user_id, "Cart updated");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_event() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender
            .send(Event::OrderCreated {
                order_id: 1,
                user_id: 2,
                total: 300_000,
            })
            .await
            .unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated { order_id, .. }) => assert_eq!(order_id, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn best_effort_publish_swallows_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        // Must not panic or error out
        sender
            .publish_best_effort(Event::PointsAdjusted {
                user_id: 9,
                delta: -25,
            })
            .await;
    }
}
