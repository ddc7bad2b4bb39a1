//! Fire-and-forget buy-back notifications
//!
//! Sinks never fail the operation that raised the event.

use crate::common::types::BuyBackOffer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BuyBackEvent {
    Offered { offer: BuyBackOffer },
    Accepted { offer: BuyBackOffer },
    Rejected { offer: BuyBackOffer },
    Expired { offer: BuyBackOffer },
}

impl BuyBackEvent {
    pub fn offer(&self) -> &BuyBackOffer {
        match self {
            BuyBackEvent::Offered { offer }
            | BuyBackEvent::Accepted { offer }
            | BuyBackEvent::Rejected { offer }
            | BuyBackEvent::Expired { offer } => offer,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BuyBackEvent::Offered { .. } => "offered",
            BuyBackEvent::Accepted { .. } => "accepted",
            BuyBackEvent::Rejected { .. } => "rejected",
            BuyBackEvent::Expired { .. } => "expired",
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, event: BuyBackEvent);
}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn notify(&self, event: BuyBackEvent) {
        let offer = event.offer();
        info!(
            kind = event.kind(),
            offer_id = %offer.id,
            venue = %offer.venue,
            previous_owner = %offer.previous_owner,
            new_owner = %offer.new_owner,
            points = offer.points_offered,
            "buy-back notification"
        );
    }
}

/// Publishes events to in-process subscribers
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<BuyBackEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuyBackEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl NotificationSink for BroadcastNotifier {
    async fn notify(&self, event: BuyBackEvent) {
        // no subscribers is not an error
        let _ = self.sender.send(event);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify(&self, _event: BuyBackEvent) {}
}
