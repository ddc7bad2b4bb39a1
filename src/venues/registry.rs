//! Venue ownership records
//!
//! Venues are created lazily with house defaults on first access. Every
//! ownership change is a guarded single-record update, so two requests racing
//! for the same venue cannot both succeed. A live buy-back offer only stays
//! on the venue while its new owner still holds it; any other ownership
//! change withdraws the offer.

use super::cache::{CacheStats, VenueCache};
use crate::common::types::{Currency, PlayerId, Venue};
use crate::common::Clock;
use crate::config::{CasinoConfig, VenueRules};
use crate::errors::{CasinoResult, OwnershipError, ValidationError};
use crate::games::types::VenueKey;
use crate::metrics::SettlementMetrics;
use crate::notify::{BuyBackEvent, NotificationSink};
use crate::storage::{BalanceProvider, CasinoStore, VenueGuard, VenuePatch};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const MAX_LOCATION_LEN: usize = 64;

pub fn validate_location(location: &str) -> Result<(), ValidationError> {
    let trimmed = location.trim();
    if trimmed.is_empty()
        || trimmed.len() != location.len()
        || location.len() > MAX_LOCATION_LEN
        || location.chars().any(char::is_control)
    {
        return Err(ValidationError::InvalidLocation(location.to_string()));
    }
    Ok(())
}

pub struct VenueRegistry {
    store: Arc<dyn CasinoStore>,
    balances: Arc<dyn BalanceProvider>,
    config: Arc<CasinoConfig>,
    clock: Arc<dyn Clock>,
    metrics: Arc<SettlementMetrics>,
    notifier: Arc<dyn NotificationSink>,
    cache: VenueCache,
}

impl VenueRegistry {
    pub fn new(
        store: Arc<dyn CasinoStore>,
        balances: Arc<dyn BalanceProvider>,
        config: Arc<CasinoConfig>,
        clock: Arc<dyn Clock>,
        metrics: Arc<SettlementMetrics>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let cache = VenueCache::new(
            config.cache.capacity,
            Duration::from_secs(config.cache.ttl_secs),
        );
        Self {
            store,
            balances,
            config,
            clock,
            metrics,
            notifier,
            cache,
        }
    }

    pub fn rules(&self, key: &VenueKey) -> &VenueRules {
        self.config.games.rules(key.game_type)
    }

    fn fresh_term(&self, key: &VenueKey, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        key.game_type
            .is_lottery()
            .then(|| now + self.config.lottery.term())
    }

    /// Load the venue, creating it with house defaults on first access
    pub async fn get_or_create(&self, key: &VenueKey) -> CasinoResult<Venue> {
        validate_location(&key.location)?;
        if let Some(venue) = self.store.load_venue(key).await? {
            return Ok(venue);
        }

        let now = self.clock.now();
        let fresh = Venue::house(
            key.clone(),
            self.rules(key).default_max_bet,
            self.fresh_term(key, now),
        );
        let venue = self.store.insert_venue_if_absent(fresh).await?;
        info!(venue = %key, max_bet = venue.max_bet, "venue opened with house defaults");
        Ok(venue)
    }

    /// Read through the cache; for display only
    pub async fn cached(&self, key: &VenueKey) -> CasinoResult<Venue> {
        if let Some(venue) = self.cache.get(key) {
            return Ok(venue);
        }
        let venue = self.get_or_create(key).await?;
        self.cache.put(venue.clone());
        Ok(venue)
    }

    pub fn invalidate(&self, key: &VenueKey) {
        self.cache.invalidate(key);
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    async fn check_category_cap(&self, key: &VenueKey, player: &str) -> CasinoResult<()> {
        let cap = self.rules(key).ownership_cap;
        let owned = self.store.venues_owned_by(player, key.game_type).await?;
        let now = self.clock.now();
        let held = owned
            .iter()
            .filter(|v| v.key != *key && !v.term_expired(now))
            .count();
        if held >= cap {
            return Err(OwnershipError::CategoryCapExceeded {
                player: player.to_string(),
                game_type: key.game_type,
                cap,
            }
            .into());
        }
        Ok(())
    }

    async fn require_owner(&self, key: &VenueKey, player: &str) -> CasinoResult<Venue> {
        let venue = self.get_or_create(key).await?;
        if !venue.is_owned_by(player) {
            return Err(not_owner(key, player));
        }
        Ok(venue)
    }

    /// Buy an unowned venue for the configured claim cost
    pub async fn claim(&self, key: &VenueKey, player: &str) -> CasinoResult<Venue> {
        let venue = self.get_or_create(key).await?;
        if let Some(owner) = venue.owner {
            return Err(OwnershipError::AlreadyOwned {
                venue: key.clone(),
                owner,
            }
            .into());
        }
        self.check_category_cap(key, player).await?;

        let cost = self.rules(key).claim_cost;
        self.balances.debit(player, Currency::Cash, cost).await?;

        let patch = VenuePatch::Reassign {
            owner: Some(player.to_string()),
            expires_at: self.fresh_term(key, self.clock.now()),
            reset_ledger: true,
        };
        let claimed = self
            .store
            .update_venue(key, VenueGuard::OwnerIs(None), patch)
            .await;
        self.invalidate(key);

        match claimed {
            Ok(Some(venue)) => {
                self.withdraw_stale_offer(key).await?;
                self.metrics.record_claim();
                info!(venue = %key, owner = player, cost, "venue claimed");
                Ok(venue)
            }
            Ok(None) => {
                // another claimant got there first
                self.balances.credit(player, Currency::Cash, cost).await?;
                let owner = self
                    .store
                    .load_venue(key)
                    .await?
                    .and_then(|v| v.owner)
                    .unwrap_or_default();
                Err(OwnershipError::AlreadyOwned {
                    venue: key.clone(),
                    owner,
                }
                .into())
            }
            Err(e) => {
                warn!(venue = %key, player, error = %e, "claim failed after debit, refunding");
                self.balances.credit(player, Currency::Cash, cost).await?;
                Err(e)
            }
        }
    }

    /// Give the venue back to the house
    pub async fn relinquish(&self, key: &VenueKey, player: &str) -> CasinoResult<Venue> {
        self.require_owner(key, player).await?;
        let patch = VenuePatch::Reassign {
            owner: None,
            expires_at: None,
            reset_ledger: true,
        };
        let venue = self
            .store
            .update_venue(key, VenueGuard::OwnerIs(Some(player.to_string())), patch)
            .await?
            .ok_or_else(|| not_owner(key, player))?;
        self.invalidate(key);
        self.withdraw_stale_offer(key).await?;

        if key.game_type.is_lottery() {
            let until = self.clock.now() + self.config.lottery.term();
            self.store.set_cooldown(key, player, until).await?;
        }
        self.metrics.record_relinquish();
        info!(venue = %key, player, "venue relinquished");
        Ok(venue)
    }

    /// Gift the venue to another player
    pub async fn transfer(&self, key: &VenueKey, from: &str, to: &str) -> CasinoResult<Venue> {
        validate_player(to)?;
        if from == to {
            return Err(OwnershipError::TransferToSelf.into());
        }
        self.require_owner(key, from).await?;
        self.check_category_cap(key, to).await?;

        let patch = VenuePatch::Reassign {
            owner: Some(to.to_string()),
            expires_at: None,
            reset_ledger: true,
        };
        let venue = self
            .store
            .update_venue(key, VenueGuard::OwnerIs(Some(from.to_string())), patch)
            .await?
            .ok_or_else(|| not_owner(key, from))?;
        self.invalidate(key);
        self.withdraw_stale_offer(key).await?;
        info!(venue = %key, from, to, "venue transferred");
        Ok(venue)
    }

    pub async fn set_max_bet(&self, key: &VenueKey, player: &str, requested: i64) -> CasinoResult<Venue> {
        self.require_owner(key, player).await?;
        let max_bet = self.rules(key).clamp_max_bet(requested);
        let venue = self
            .store
            .update_venue(
                key,
                VenueGuard::OwnerIs(Some(player.to_string())),
                VenuePatch::SetMaxBet(max_bet),
            )
            .await?
            .ok_or_else(|| not_owner(key, player))?;
        self.invalidate(key);
        info!(venue = %key, requested, max_bet, "max bet updated");
        Ok(venue)
    }

    pub async fn set_buy_back_reward(
        &self,
        key: &VenueKey,
        player: &str,
        requested: i64,
    ) -> CasinoResult<Venue> {
        self.require_owner(key, player).await?;
        let amount = self.rules(key).clamp_buy_back_reward(requested);
        let venue = self
            .store
            .update_venue(
                key,
                VenueGuard::OwnerIs(Some(player.to_string())),
                VenuePatch::SetBuyBackReward(amount),
            )
            .await?
            .ok_or_else(|| not_owner(key, player))?;
        self.invalidate(key);
        info!(venue = %key, requested, amount, "buy-back reward updated");
        Ok(venue)
    }

    pub async fn add_profit(&self, key: &VenueKey, delta: i64) -> CasinoResult<Option<Venue>> {
        let venue = self
            .store
            .update_venue(key, VenueGuard::Any, VenuePatch::AddProfit(delta))
            .await?;
        self.invalidate(key);
        Ok(venue)
    }

    /// Guarded ownership change used by settlement, buy-back and the lottery
    pub async fn reassign(
        &self,
        key: &VenueKey,
        guard: VenueGuard,
        owner: Option<PlayerId>,
        expires_at: Option<DateTime<Utc>>,
        reset_ledger: bool,
    ) -> CasinoResult<Option<Venue>> {
        let patch = VenuePatch::Reassign {
            owner,
            expires_at,
            reset_ledger,
        };
        let venue = self.store.update_venue(key, guard, patch).await?;
        self.invalidate(key);
        if venue.is_some() {
            self.withdraw_stale_offer(key).await?;
        }
        Ok(venue)
    }

    /// Withdraw the venue's live offer if its new owner no longer holds the venue
    async fn withdraw_stale_offer(&self, key: &VenueKey) -> CasinoResult<()> {
        let Some(offer) = self.store.offer_for_venue(key).await? else {
            return Ok(());
        };
        let holder = self.store.load_venue(key).await?.and_then(|v| v.owner);
        if holder.as_deref() == Some(offer.new_owner.as_str()) {
            return Ok(());
        }
        if let Some(offer) = self.store.take_offer(&offer.id).await? {
            self.metrics.record_offer_expired();
            info!(
                offer_id = %offer.id,
                venue = %key,
                new_owner = %offer.new_owner,
                holder = ?holder,
                "buy-back offer withdrawn after ownership change"
            );
            self.notifier.notify(BuyBackEvent::Expired { offer }).await;
        }
        Ok(())
    }
}

fn not_owner(key: &VenueKey, player: &str) -> crate::errors::CasinoError {
    OwnershipError::NotOwner {
        venue: key.clone(),
        player: player.to_string(),
    }
    .into()
}

fn validate_player(player: &str) -> Result<(), ValidationError> {
    if player.trim().is_empty() {
        return Err(ValidationError::InvalidBet("target player id is empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::BuyBackOffer;
    use crate::common::ManualClock;
    use crate::config::ConfigBuilder;
    use crate::errors::{CasinoError, FundsError};
    use crate::games::types::GameType;
    use crate::notify::NoopNotifier;
    use crate::storage::{MemoryBalances, MemoryStore};

    struct Fixture {
        registry: VenueRegistry,
        balances: Arc<MemoryBalances>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let balances = Arc::new(MemoryBalances::new());
        let clock = Arc::new(ManualClock::at_unix(1_000_000));
        let config = Arc::new(ConfigBuilder::new().claim_cost(GameType::Roulette, 1_000).build());
        let registry = VenueRegistry::new(
            store.clone(),
            balances.clone(),
            config,
            clock.clone(),
            Arc::new(SettlementMetrics::new()),
            Arc::new(NoopNotifier),
        );
        Fixture {
            registry,
            balances,
            store,
            clock,
        }
    }

    fn roulette(location: &str) -> VenueKey {
        VenueKey::new(GameType::Roulette, location)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let f = fixture();
        let a = f.registry.get_or_create(&roulette("paris")).await.unwrap();
        let b = f.registry.get_or_create(&roulette("paris")).await.unwrap();
        assert_eq!(a, b);
        assert!(a.is_house_backed());
        assert_eq!(a.max_bet, 5_000_000);
        assert!(a.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_lottery_venue_gets_a_term() {
        let f = fixture();
        let venue = f
            .registry
            .get_or_create(&VenueKey::new(GameType::Slots, "reno"))
            .await
            .unwrap();
        assert_eq!(
            venue.expires_at,
            Some(f.clock.now() + chrono::Duration::seconds(86_400))
        );
    }

    #[tokio::test]
    async fn test_invalid_locations_rejected() {
        let f = fixture();
        let long = "x".repeat(MAX_LOCATION_LEN + 1);
        for location in ["", "  ", " padded", long.as_str()] {
            let err = f.registry.get_or_create(&roulette(location)).await.unwrap_err();
            assert!(matches!(err, CasinoError::Validation(ValidationError::InvalidLocation(_))));
        }
    }

    #[tokio::test]
    async fn test_claim_debits_cost_and_sets_owner() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 5_000);
        let venue = f.registry.claim(&roulette("paris"), "bob").await.unwrap();
        assert!(venue.is_owned_by("bob"));
        assert_eq!(venue.profit, 0);
        assert_eq!(f.balances.balance("bob", Currency::Cash).await.unwrap(), 4_000);

        f.balances.set("carol", Currency::Cash, 5_000);
        let err = f.registry.claim(&roulette("paris"), "carol").await.unwrap_err();
        assert!(matches!(err, CasinoError::Ownership(OwnershipError::AlreadyOwned { .. })));
        assert_eq!(f.balances.balance("carol", Currency::Cash).await.unwrap(), 5_000);
    }

    #[tokio::test]
    async fn test_claim_requires_funds() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 999);
        let err = f.registry.claim(&roulette("paris"), "bob").await.unwrap_err();
        assert!(matches!(err, CasinoError::Funds(FundsError::InsufficientFunds { .. })));
        assert!(f
            .registry
            .get_or_create(&roulette("paris"))
            .await
            .unwrap()
            .is_house_backed());
    }

    #[tokio::test]
    async fn test_category_cap() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000_000);
        f.registry.claim(&roulette("paris"), "bob").await.unwrap();
        let err = f.registry.claim(&roulette("rome"), "bob").await.unwrap_err();
        assert!(matches!(
            err,
            CasinoError::Ownership(OwnershipError::CategoryCapExceeded { cap: 1, .. })
        ));

        // a different game type is a different category
        f.registry
            .claim(&VenueKey::new(GameType::Dice, "rome"), "bob")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_owner_only_settings_are_clamped() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000);
        let key = roulette("paris");
        f.registry.claim(&key, "bob").await.unwrap();

        let err = f.registry.set_max_bet(&key, "mallory", 10).await.unwrap_err();
        assert_eq!(err.code(), "FORBIDDEN");

        let venue = f.registry.set_max_bet(&key, "bob", 1).await.unwrap();
        assert_eq!(venue.max_bet, 1_000);
        let venue = f.registry.set_max_bet(&key, "bob", i64::MAX).await.unwrap();
        assert_eq!(venue.max_bet, 100_000_000);

        let venue = f.registry.set_buy_back_reward(&key, "bob", -5).await.unwrap();
        assert_eq!(venue.buy_back_reward, 0);
        let venue = f.registry.set_buy_back_reward(&key, "bob", 5_000).await.unwrap();
        assert_eq!(venue.buy_back_reward, 5_000);
    }

    #[tokio::test]
    async fn test_relinquish_and_transfer() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000);
        let key = roulette("paris");
        f.registry.claim(&key, "bob").await.unwrap();

        assert!(matches!(
            f.registry.transfer(&key, "bob", "bob").await.unwrap_err(),
            CasinoError::Ownership(OwnershipError::TransferToSelf)
        ));
        let venue = f.registry.transfer(&key, "bob", "carol").await.unwrap();
        assert!(venue.is_owned_by("carol"));

        assert!(f.registry.relinquish(&key, "bob").await.is_err());
        let venue = f.registry.relinquish(&key, "carol").await.unwrap();
        assert!(venue.is_house_backed());
    }

    #[tokio::test]
    async fn test_lottery_relinquish_starts_cooldown() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000_000);
        let key = VenueKey::new(GameType::Slots, "reno");
        f.registry.claim(&key, "bob").await.unwrap();
        f.registry.relinquish(&key, "bob").await.unwrap();

        let pool = f.store.load_pool(&key).await.unwrap();
        assert!(pool.cooling_down_until("bob", f.clock.now()).is_some());
    }

    #[tokio::test]
    async fn test_cache_invalidated_on_write() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000);
        let key = roulette("paris");
        assert!(f.registry.cached(&key).await.unwrap().is_house_backed());
        f.registry.claim(&key, "bob").await.unwrap();
        assert!(f.registry.cached(&key).await.unwrap().is_owned_by("bob"));
    }

    #[tokio::test]
    async fn test_lapsed_lottery_term_frees_the_category() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000_000);
        f.registry
            .claim(&VenueKey::new(GameType::Slots, "reno"), "bob")
            .await
            .unwrap();
        let vegas = VenueKey::new(GameType::Slots, "vegas");
        assert!(f.registry.claim(&vegas, "bob").await.is_err());

        f.clock.advance(chrono::Duration::seconds(86_400));
        let venue = f.registry.claim(&vegas, "bob").await.unwrap();
        assert!(venue.is_owned_by("bob"));
    }

    fn offer_to(key: &VenueKey, new_owner: &str, now: DateTime<Utc>) -> BuyBackOffer {
        BuyBackOffer {
            id: format!("offer-{}", new_owner),
            venue: key.clone(),
            previous_owner: "alice".into(),
            new_owner: new_owner.into(),
            points_offered: 5_000,
            amount_shortfall: 100,
            owner_paid: 0,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(120),
        }
    }

    #[tokio::test]
    async fn test_ownership_change_withdraws_stale_offer() {
        let f = fixture();
        f.balances.set("bob", Currency::Cash, 10_000);
        let key = roulette("paris");
        f.registry.claim(&key, "bob").await.unwrap();
        let now = f.clock.now();
        assert!(f.store.insert_offer(offer_to(&key, "bob", now), now).await.unwrap());

        // settings changes leave the holder in place
        f.registry.set_max_bet(&key, "bob", 10_000).await.unwrap();
        assert!(f.store.offer_for_venue(&key).await.unwrap().is_some());

        f.registry.transfer(&key, "bob", "carol").await.unwrap();
        assert!(f.store.offer_for_venue(&key).await.unwrap().is_none());
        assert!(f.store.load_offer("offer-bob").await.unwrap().is_none());

        // an offer to the new holder survives a reassignment that keeps them
        assert!(f.store.insert_offer(offer_to(&key, "carol", now), now).await.unwrap());
        f.registry
            .reassign(&key, VenueGuard::Any, Some("carol".into()), None, false)
            .await
            .unwrap();
        assert!(f.store.offer_for_venue(&key).await.unwrap().is_some());

        f.registry.relinquish(&key, "carol").await.unwrap();
        assert!(f.store.offer_for_venue(&key).await.unwrap().is_none());
    }
}
