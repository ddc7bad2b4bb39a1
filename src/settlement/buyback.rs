//! Buy-back offer lifecycle
//!
//! An offer exists only while pending. Whoever takes the record out of the
//! store owns its resolution, so accept, reject and expiry can race freely and
//! exactly one of them wins.

use crate::common::types::{
    BuyBackDecision, BuyBackOffer, BuyBackResolution, Currency, PlayerId,
};
use crate::common::Clock;
use crate::errors::{CasinoError, CasinoResult, FundsError, OwnershipError};
use crate::games::types::VenueKey;
use crate::metrics::SettlementMetrics;
use crate::notify::{BuyBackEvent, NotificationSink};
use crate::storage::{BalanceProvider, CasinoStore, VenueGuard};
use crate::venues::VenueRegistry;
use std::sync::Arc;
use tracing::{info, warn};

pub struct BuyBackDesk {
    registry: Arc<VenueRegistry>,
    store: Arc<dyn CasinoStore>,
    balances: Arc<dyn BalanceProvider>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<SettlementMetrics>,
    clock: Arc<dyn Clock>,
}

impl BuyBackDesk {
    pub fn new(
        registry: Arc<VenueRegistry>,
        store: Arc<dyn CasinoStore>,
        balances: Arc<dyn BalanceProvider>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<SettlementMetrics>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            balances,
            notifier,
            metrics,
            clock,
        }
    }

    /// Remove an expired offer; no-op if something else already resolved it
    async fn expire(&self, offer: &BuyBackOffer) -> CasinoResult<()> {
        if let Some(offer) = self.store.take_offer(&offer.id).await? {
            self.metrics.record_offer_expired();
            info!(offer_id = %offer.id, venue = %offer.venue, "buy-back offer expired");
            self.notifier.notify(BuyBackEvent::Expired { offer }).await;
        }
        Ok(())
    }

    /// Expired offers are cleaned up on read
    async fn keep_live(&self, offer: Option<BuyBackOffer>) -> CasinoResult<Option<BuyBackOffer>> {
        match offer {
            Some(offer) if offer.is_live(self.clock.now()) => Ok(Some(offer)),
            Some(offer) => {
                self.expire(&offer).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn live_offer(&self, offer_id: &str) -> CasinoResult<Option<BuyBackOffer>> {
        let offer = self.store.load_offer(offer_id).await?;
        self.keep_live(offer).await
    }

    pub async fn offer_for_venue(&self, key: &VenueKey) -> CasinoResult<Option<BuyBackOffer>> {
        let offer = self.store.offer_for_venue(key).await?;
        self.keep_live(offer).await
    }

    /// Live offers awaiting a decision from `player`
    pub async fn pending_for(&self, player: &str) -> CasinoResult<Vec<BuyBackOffer>> {
        let mut pending = Vec::new();
        for offer in self.store.offers_for_player(player).await? {
            if let Some(offer) = self.keep_live(Some(offer)).await? {
                pending.push(offer);
            }
        }
        Ok(pending)
    }

    pub async fn respond(
        &self,
        offer_id: &str,
        responder: &str,
        decision: BuyBackDecision,
    ) -> CasinoResult<BuyBackResolution> {
        let offer = self.pending(offer_id, responder).await?;
        match decision {
            BuyBackDecision::Accept => self.accept(offer).await,
            BuyBackDecision::Reject => self.reject(offer).await,
        }
    }

    /// Load an offer the responder may act on
    async fn pending(&self, offer_id: &str, responder: &str) -> CasinoResult<BuyBackOffer> {
        let offer = self
            .store
            .load_offer(offer_id)
            .await?
            .ok_or_else(|| CasinoError::OfferNotFound(offer_id.to_string()))?;
        if offer.new_owner != responder {
            return Err(OwnershipError::NotResponder.into());
        }
        if !offer.is_live(self.clock.now()) {
            self.expire(&offer).await?;
            return Err(CasinoError::OfferNotFound(offer_id.to_string()));
        }
        Ok(offer)
    }

    async fn accept(&self, offer: BuyBackOffer) -> CasinoResult<BuyBackResolution> {
        let points = offer.points_offered;
        let payer: &PlayerId = &offer.previous_owner;

        // checked before the offer is taken so a short payer leaves it live
        let available = self.balances.balance(payer, Currency::Points).await?;
        if available < points {
            return Err(FundsError::InsufficientFunds {
                currency: Currency::Points,
                required: points,
                available,
            }
            .into());
        }

        let offer = self
            .store
            .take_offer(&offer.id)
            .await?
            .ok_or_else(|| CasinoError::OfferNotFound(offer.id.clone()))?;

        if let Err(e) = self.balances.debit(payer, Currency::Points, points).await {
            self.restore(&offer).await;
            return Err(e);
        }

        let returned = self
            .registry
            .reassign(
                &offer.venue,
                VenueGuard::OwnerIs(Some(offer.new_owner.clone())),
                Some(offer.previous_owner.clone()),
                None,
                true,
            )
            .await;

        let venue = match returned {
            Ok(Some(venue)) => venue,
            Ok(None) => {
                self.balances.credit(payer, Currency::Points, points).await?;
                warn!(offer_id = %offer.id, venue = %offer.venue, "venue changed hands before buy-back completed");
                return Err(OwnershipError::OwnershipChanged(offer.venue.clone()).into());
            }
            Err(e) => {
                self.balances.credit(payer, Currency::Points, points).await?;
                return Err(e);
            }
        };

        self.balances
            .credit(&offer.new_owner, Currency::Points, points)
            .await?;

        self.metrics.record_offer_accepted();
        info!(
            offer_id = %offer.id,
            venue = %offer.venue,
            previous_owner = %offer.previous_owner,
            points,
            "buy-back accepted"
        );
        self.notifier
            .notify(BuyBackEvent::Accepted {
                offer: offer.clone(),
            })
            .await;
        Ok(BuyBackResolution::Accepted { offer, venue })
    }

    async fn reject(&self, offer: BuyBackOffer) -> CasinoResult<BuyBackResolution> {
        let offer = self
            .store
            .take_offer(&offer.id)
            .await?
            .ok_or_else(|| CasinoError::OfferNotFound(offer.id.clone()))?;

        self.metrics.record_offer_rejected();
        info!(offer_id = %offer.id, venue = %offer.venue, "buy-back rejected");
        self.notifier
            .notify(BuyBackEvent::Rejected {
                offer: offer.clone(),
            })
            .await;
        Ok(BuyBackResolution::Rejected { offer })
    }

    /// Put a taken offer back after a failed points transfer, unless the
    /// venue changed hands while it was out of the store
    async fn restore(&self, offer: &BuyBackOffer) {
        let holder = match self.store.load_venue(&offer.venue).await {
            Ok(venue) => venue.and_then(|v| v.owner),
            Err(e) => {
                warn!(offer_id = %offer.id, error = %e, "failed to restore buy-back offer");
                return;
            }
        };
        if holder.as_deref() != Some(offer.new_owner.as_str()) {
            self.metrics.record_offer_expired();
            info!(offer_id = %offer.id, venue = %offer.venue, "buy-back offer dropped, venue changed hands");
            self.notifier
                .notify(BuyBackEvent::Expired {
                    offer: offer.clone(),
                })
                .await;
            return;
        }
        match self.store.insert_offer(offer.clone(), self.clock.now()).await {
            Ok(true) => {}
            Ok(false) => warn!(offer_id = %offer.id, "could not restore buy-back offer, venue has a newer one"),
            Err(e) => warn!(offer_id = %offer.id, error = %e, "failed to restore buy-back offer"),
        }
    }
}
