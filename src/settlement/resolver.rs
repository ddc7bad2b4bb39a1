//! Wager settlement
//!
//! Settlement is a short sequence of single-record atomic steps: debit the
//! stake, then move money between player, owner and house according to the
//! draw. The owner's balance is re-read right before it is charged, and the
//! charge itself is conditional, so concurrent winners at one under-funded
//! venue can never push the owner negative.

use crate::common::types::{
    BuyBackOffer, Currency, HistoryEntry, PlayerId, PlayerIdentity, Venue, WagerOutcome,
    WagerState,
};
use crate::common::Clock;
use crate::config::{CasinoConfig, ShortfallPolicy};
use crate::errors::{CasinoError, CasinoResult, StorageError};
use crate::games::types::{Draw, VenueKey};
use crate::metrics::SettlementMetrics;
use crate::notify::{BuyBackEvent, NotificationSink};
use crate::storage::{BalanceProvider, CasinoStore, VenueGuard};
use crate::venues::VenueRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Attempts at charging an owner whose balance keeps moving underneath us
const MAX_OWNER_DEBIT_ATTEMPTS: usize = 16;

pub struct SettlementResolver {
    registry: Arc<VenueRegistry>,
    store: Arc<dyn CasinoStore>,
    balances: Arc<dyn BalanceProvider>,
    notifier: Arc<dyn NotificationSink>,
    metrics: Arc<SettlementMetrics>,
    config: Arc<CasinoConfig>,
    clock: Arc<dyn Clock>,
}

impl SettlementResolver {
    pub fn new(
        registry: Arc<VenueRegistry>,
        store: Arc<dyn CasinoStore>,
        balances: Arc<dyn BalanceProvider>,
        notifier: Arc<dyn NotificationSink>,
        metrics: Arc<SettlementMetrics>,
        config: Arc<CasinoConfig>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            balances,
            notifier,
            metrics,
            config,
            clock,
        }
    }

    /// Settle one validated wager against the venue's current owner
    pub async fn settle(
        &self,
        player: &PlayerIdentity,
        key: &VenueKey,
        stake: i64,
        draw: Draw,
    ) -> CasinoResult<WagerOutcome> {
        self.balances.debit(&player.id, Currency::Cash, stake).await?;

        let now = self.clock.now();
        let mut outcome = WagerOutcome::staked(
            Uuid::new_v4().to_string(),
            player.id.clone(),
            key.clone(),
            stake,
            draw,
            now,
        );

        let venue = self
            .store
            .load_venue(key)
            .await?
            .ok_or_else(|| {
                StorageError::ReadFailed(format!("venue {} vanished during settlement", key))
            })?;

        let gross = outcome.multiplier.gross_payout(stake);
        if gross <= 0 {
            self.settle_loss(&venue, &mut outcome).await?;
        } else {
            let winnings = (gross - stake).max(0);
            outcome.gross_payout = stake + winnings;
            match venue.owner.clone() {
                None => {
                    self.balances
                        .credit(&player.id, Currency::Cash, outcome.gross_payout)
                        .await?;
                    outcome.actual_payout = outcome.gross_payout;
                    outcome.state = WagerState::WonFull;
                }
                Some(owner) => {
                    self.settle_owned_win(&venue, &owner, winnings, &mut outcome)
                        .await?;
                }
            }
        }

        self.record(player, &outcome).await?;
        Ok(outcome)
    }

    async fn settle_loss(&self, venue: &Venue, outcome: &mut WagerOutcome) -> CasinoResult<()> {
        if let Some(owner) = &venue.owner {
            self.balances
                .credit(owner, Currency::Cash, outcome.stake)
                .await?;
            self.registry.add_profit(&venue.key, outcome.stake).await?;
        }
        outcome.state = WagerState::Lost;
        Ok(())
    }

    /// Charge the owner as much of `winnings` as their live balance allows.
    /// Fails with `Contention` if the balance never holds still long enough.
    async fn charge_owner(&self, owner: &str, winnings: i64) -> CasinoResult<i64> {
        for attempt in 0..MAX_OWNER_DEBIT_ATTEMPTS {
            let available = self.balances.balance(owner, Currency::Cash).await?.max(0);
            let covered = winnings.min(available);
            if covered == 0 {
                return Ok(0);
            }
            match self.balances.debit(owner, Currency::Cash, covered).await {
                Ok(_) => return Ok(covered),
                Err(CasinoError::Funds(_)) => {
                    debug!(owner, attempt, "owner balance moved during settlement, re-reading");
                }
                Err(e) => return Err(e),
            }
        }
        Err(CasinoError::Contention(format!(
            "balance of {} kept changing during settlement",
            owner
        )))
    }

    async fn settle_owned_win(
        &self,
        venue: &Venue,
        owner: &PlayerId,
        winnings: i64,
        outcome: &mut WagerOutcome,
    ) -> CasinoResult<()> {
        let key = &venue.key;
        let covered = match self.charge_owner(owner, winnings).await {
            Ok(covered) => covered,
            Err(e @ CasinoError::Contention(_)) => {
                // nothing was charged; return the stake
                self.balances
                    .credit(&outcome.player_id, Currency::Cash, outcome.stake)
                    .await?;
                warn!(venue = %key, owner = %owner, winnings, "owner balance contended, wager rolled back");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let shortfall = winnings - covered;

        outcome.actual_payout = outcome.stake + covered;
        outcome.shortfall = shortfall;
        self.balances
            .credit(&outcome.player_id, Currency::Cash, outcome.actual_payout)
            .await?;
        if covered > 0 {
            self.registry.add_profit(key, -covered).await?;
        }

        if shortfall == 0 {
            outcome.state = WagerState::WonFull;
            return Ok(());
        }

        info!(
            venue = %key,
            owner = %owner,
            winner = %outcome.player_id,
            winnings,
            covered,
            shortfall,
            "owner could not cover win"
        );

        if venue.buy_back_reward > 0 {
            self.transfer_to_winner(venue, owner, covered, outcome).await
        } else {
            self.absorb_shortfall(venue, owner, outcome).await
        }
    }

    async fn absorb_shortfall(
        &self,
        venue: &Venue,
        owner: &PlayerId,
        outcome: &mut WagerOutcome,
    ) -> CasinoResult<()> {
        outcome.state = WagerState::WonShortfallAbsorbed;
        let policy = self.config.games.rules(venue.key.game_type).shortfall_policy;
        if policy == ShortfallPolicy::KeepOwner {
            return Ok(());
        }

        let cleared = self
            .registry
            .reassign(
                &venue.key,
                VenueGuard::OwnerIs(Some(owner.clone())),
                None,
                None,
                true,
            )
            .await?;
        outcome.owner_forfeited = cleared.is_some();
        if outcome.owner_forfeited {
            info!(venue = %venue.key, owner = %owner, "venue forced back to the house");
        }
        Ok(())
    }

    async fn transfer_to_winner(
        &self,
        venue: &Venue,
        owner: &PlayerId,
        covered: i64,
        outcome: &mut WagerOutcome,
    ) -> CasinoResult<()> {
        let key = &venue.key;
        let transferred = self
            .registry
            .reassign(
                key,
                VenueGuard::OwnerIs(Some(owner.clone())),
                Some(outcome.player_id.clone()),
                None,
                true,
            )
            .await?;

        if transferred.is_none() {
            // a concurrent settlement already took the venue from this owner
            outcome.state = WagerState::WonShortfallAbsorbed;
            return Ok(());
        }
        outcome.state = WagerState::WonShortfallTransferred;
        outcome.ownership_transferred = true;
        outcome.owner_forfeited = true;

        let now = self.clock.now();
        let offer = BuyBackOffer {
            id: Uuid::new_v4().to_string(),
            venue: key.clone(),
            previous_owner: owner.clone(),
            new_owner: outcome.player_id.clone(),
            points_offered: venue.buy_back_reward,
            amount_shortfall: outcome.shortfall,
            owner_paid: covered,
            created_at: now,
            expires_at: now + self.config.buy_back.offer_ttl(),
        };

        if self.store.insert_offer(offer.clone(), now).await? {
            self.metrics.record_offer_created();
            info!(
                venue = %key,
                offer_id = %offer.id,
                previous_owner = %offer.previous_owner,
                new_owner = %offer.new_owner,
                points = offer.points_offered,
                "buy-back offer created"
            );
            self.notifier
                .notify(BuyBackEvent::Offered {
                    offer: offer.clone(),
                })
                .await;
            outcome.buy_back_offer = Some(offer);
        } else {
            warn!(venue = %key, "live buy-back offer already present, not stacking another");
        }
        Ok(())
    }

    async fn record(&self, player: &PlayerIdentity, outcome: &WagerOutcome) -> CasinoResult<()> {
        self.metrics.record_wager(
            outcome.state,
            outcome.stake,
            outcome.actual_payout,
            outcome.shortfall,
        );
        info!(
            wager_id = %outcome.wager_id,
            venue = %outcome.venue,
            player = %player.id,
            stake = outcome.stake,
            outcome = %outcome.outcome_key,
            state = outcome.state.as_str(),
            payout = outcome.actual_payout,
            "wager settled"
        );
        self.store
            .push_history(
                &player.id,
                outcome.venue.game_type,
                HistoryEntry::from_outcome(outcome, &player.display_name),
                self.config.history.limit,
            )
            .await
    }
}
