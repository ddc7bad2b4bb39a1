//! Casino service facade
//!
//! Wires the registry, validator, payout calculator, settlement resolver,
//! buy-back desk and lottery over one store and one balance provider, and
//! exposes the player-facing operations.

use crate::common::types::{
    BuyBackOffer, BuyBackResolution, ClaimResponse, HistoryEntry, LotteryEntry, OwnedVenue, PlaceWager,
    PlayerIdentity, RespondBuyBack, Venue, VenueStatus, WagerOutcome,
};
use crate::common::{Clock, SystemClock};
use crate::config::{CasinoConfig, StorageBackend};
use crate::errors::CasinoResult;
use crate::games::{GameRng, GameStrategy, GameType, PayoutCalculator, VenueKey};
use crate::lottery::LotteryScheduler;
use crate::metrics::SettlementMetrics;
use crate::notify::{NotificationSink, TracingNotifier};
use crate::settlement::{BuyBackDesk, SettlementResolver};
use crate::storage::{BalanceProvider, CasinoStore, MemoryBalances, MemoryStore, RocksStore};
use crate::venues::{validate_location, CacheStats, VenueRegistry, WagerValidator};
use futures::future::try_join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

pub struct CasinoService {
    config: Arc<CasinoConfig>,
    store: Arc<dyn CasinoStore>,
    registry: Arc<VenueRegistry>,
    validator: WagerValidator,
    calculator: PayoutCalculator,
    resolver: SettlementResolver,
    desk: BuyBackDesk,
    lottery: LotteryScheduler,
    metrics: Arc<SettlementMetrics>,
    server_seed: Option<[u8; 32]>,
    nonce: AtomicU64,
}

/// Assembles a [`CasinoService`]; unset parts fall back to in-memory defaults
pub struct CasinoServiceBuilder {
    config: CasinoConfig,
    store: Option<Arc<dyn CasinoStore>>,
    balances: Option<Arc<dyn BalanceProvider>>,
    clock: Option<Arc<dyn Clock>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    seed: Option<u64>,
    strategies: Vec<Box<dyn GameStrategy>>,
}

impl CasinoServiceBuilder {
    pub fn new(config: CasinoConfig) -> Self {
        Self {
            config,
            store: None,
            balances: None,
            clock: None,
            notifier: None,
            seed: None,
            strategies: Vec::new(),
        }
    }

    pub fn store(mut self, store: Arc<dyn CasinoStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn balances(mut self, balances: Arc<dyn BalanceProvider>) -> Self {
        self.balances = Some(balances);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Makes every draw reproducible
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Replace the built-in rules for one game
    pub fn strategy(mut self, strategy: Box<dyn GameStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn build(self) -> CasinoService {
        let config = Arc::new(self.config);
        let store: Arc<dyn CasinoStore> = match self.store {
            Some(store) => store,
            None => Arc::new(MemoryStore::new()),
        };
        let balances: Arc<dyn BalanceProvider> = match self.balances {
            Some(balances) => balances,
            None => Arc::new(MemoryBalances::with_opening(
                config.balances.opening_cash,
                config.balances.opening_points,
            )),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock),
        };
        let notifier: Arc<dyn NotificationSink> = match self.notifier {
            Some(notifier) => notifier,
            None => Arc::new(TracingNotifier),
        };
        let metrics = Arc::new(SettlementMetrics::new());

        let registry = Arc::new(VenueRegistry::new(
            store.clone(),
            balances.clone(),
            config.clone(),
            clock.clone(),
            metrics.clone(),
            notifier.clone(),
        ));
        let resolver = SettlementResolver::new(
            registry.clone(),
            store.clone(),
            balances.clone(),
            notifier.clone(),
            metrics.clone(),
            config.clone(),
            clock.clone(),
        );
        let desk = BuyBackDesk::new(
            registry.clone(),
            store.clone(),
            balances.clone(),
            notifier,
            metrics.clone(),
            clock.clone(),
        );
        let lottery_rng = match self.seed {
            Some(seed) => GameRng::seeded(seed ^ 0x5eed_1077),
            None => GameRng::from_entropy(),
        };
        let lottery = LotteryScheduler::new(
            registry.clone(),
            store.clone(),
            config.clone(),
            clock,
            metrics.clone(),
            lottery_rng,
        );

        let calculator = self
            .strategies
            .into_iter()
            .fold(PayoutCalculator::new(&config), PayoutCalculator::with_strategy);

        CasinoService {
            calculator,
            validator: WagerValidator::new(balances),
            server_seed: self.seed.map(server_seed),
            nonce: AtomicU64::new(0),
            config,
            store,
            registry,
            resolver,
            desk,
            lottery,
            metrics,
        }
    }
}

fn server_seed(seed: u64) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&seed.to_be_bytes());
    bytes
}

impl CasinoService {
    pub fn builder(config: CasinoConfig) -> CasinoServiceBuilder {
        CasinoServiceBuilder::new(config)
    }

    /// Build the service with the storage backend named in the config
    pub fn open(config: CasinoConfig) -> CasinoResult<Self> {
        let store: Arc<dyn CasinoStore> = match config.storage.backend {
            StorageBackend::Memory => Arc::new(MemoryStore::new()),
            StorageBackend::Rocksdb => Arc::new(RocksStore::open(&config.storage.data_dir)?),
        };
        info!(backend = ?config.storage.backend, "casino storage ready");
        Ok(Self::builder(config).store(store).build())
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    pub fn metrics(&self) -> &SettlementMetrics {
        &self.metrics
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.registry.cache_stats()
    }

    fn next_rng(&self) -> GameRng {
        match &self.server_seed {
            Some(seed) => {
                let nonce = self.nonce.fetch_add(1, Ordering::Relaxed);
                GameRng::derive(seed, &nonce.to_be_bytes())
            }
            None => GameRng::from_entropy(),
        }
    }

    /// Venue state for decisions: lottery venues are redrawn first if due
    async fn current(&self, key: &VenueKey) -> CasinoResult<Venue> {
        if key.game_type.is_lottery() {
            self.lottery.refresh(key).await
        } else {
            self.registry.get_or_create(key).await
        }
    }

    /// Validate, draw and settle one wager
    pub async fn place_wager(
        &self,
        player: &PlayerIdentity,
        wager: PlaceWager,
    ) -> CasinoResult<WagerOutcome> {
        let key = wager.venue;
        validate_location(&key.location)?;
        self.calculator
            .validate_bet_shape(key.game_type, &wager.params)?;

        let venue = self.current(&key).await?;
        self.validator.validate(&venue, &player.id, wager.stake).await?;

        let draw = {
            let mut rng = self.next_rng();
            self.calculator.compute(key.game_type, &wager.params, &mut rng)?
        };
        self.resolver.settle(player, &key, wager.stake, draw).await
    }

    pub async fn claim_venue(&self, player: &PlayerIdentity, key: &VenueKey) -> CasinoResult<ClaimResponse> {
        self.current(key).await?;
        let venue = self.registry.claim(key, &player.id).await?;
        Ok(ClaimResponse {
            owner: player.id.clone(),
            max_bet: venue.max_bet,
        })
    }

    pub async fn relinquish_venue(&self, player: &PlayerIdentity, key: &VenueKey) -> CasinoResult<Venue> {
        self.current(key).await?;
        self.registry.relinquish(key, &player.id).await
    }

    pub async fn transfer_venue(
        &self,
        player: &PlayerIdentity,
        key: &VenueKey,
        to: &str,
    ) -> CasinoResult<Venue> {
        self.current(key).await?;
        self.registry.transfer(key, &player.id, to).await
    }

    pub async fn set_max_bet(&self, player: &PlayerIdentity, key: &VenueKey, max_bet: i64) -> CasinoResult<Venue> {
        self.current(key).await?;
        self.registry.set_max_bet(key, &player.id, max_bet).await
    }

    pub async fn set_buy_back_reward(
        &self,
        player: &PlayerIdentity,
        key: &VenueKey,
        amount: i64,
    ) -> CasinoResult<Venue> {
        self.current(key).await?;
        self.registry.set_buy_back_reward(key, &player.id, amount).await
    }

    pub async fn respond_buy_back(
        &self,
        player: &PlayerIdentity,
        response: RespondBuyBack,
    ) -> CasinoResult<BuyBackResolution> {
        self.desk
            .respond(&response.offer_id, &player.id, response.decision)
            .await
    }

    pub async fn pending_offers(&self, player: &PlayerIdentity) -> CasinoResult<Vec<BuyBackOffer>> {
        self.desk.pending_for(&player.id).await
    }

    pub async fn enter_lottery(&self, player: &PlayerIdentity, key: &VenueKey) -> CasinoResult<LotteryEntry> {
        validate_location(&key.location)?;
        self.lottery.enter(key, &player.id).await
    }

    /// Display view of a venue, served from the cache where possible
    pub async fn venue_status(&self, key: &VenueKey) -> CasinoResult<VenueStatus> {
        let venue = if key.game_type.is_lottery() {
            self.lottery.refresh(key).await?
        } else {
            self.registry.cached(key).await?
        };
        let live_offer = self.desk.offer_for_venue(key).await?;
        let lottery_entrants = if key.game_type.is_lottery() {
            self.lottery.entrant_count(key).await?
        } else {
            0
        };
        Ok(VenueStatus {
            venue,
            live_offer,
            lottery_entrants,
        })
    }

    pub async fn owned_venues(&self, player: &PlayerIdentity) -> CasinoResult<Vec<OwnedVenue>> {
        let per_game = try_join_all(
            GameType::ALL
                .into_iter()
                .map(|game_type| self.store.venues_owned_by(&player.id, game_type)),
        )
        .await?;

        let mut owned = Vec::new();
        for venue in per_game.into_iter().flatten() {
            // a lapsed lottery term is redrawn before it is reported
            let venue = if venue.key.game_type.is_lottery() {
                self.lottery.refresh(&venue.key).await?
            } else {
                venue
            };
            if venue.is_owned_by(&player.id) {
                owned.push(OwnedVenue::from(&venue));
            }
        }
        Ok(owned)
    }

    pub async fn recent_history(
        &self,
        player: &PlayerIdentity,
        game_type: GameType,
    ) -> CasinoResult<Vec<HistoryEntry>> {
        self.store
            .recent_history(&player.id, game_type, self.config.history.limit)
            .await
    }
}
