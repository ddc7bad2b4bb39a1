//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use venue_casino::common::{ManualClock, Clock};
use venue_casino::config::ConfigBuilder;
use venue_casino::errors::ValidationError;
use venue_casino::games::{Draw, GameDetail, GameRng, GameStrategy, Multiplier};
use venue_casino::notify::BroadcastNotifier;
use venue_casino::storage::{BalanceProvider, MemoryBalances, MemoryStore};
use venue_casino::{
    CasinoConfig, CasinoService, Currency, GameParams, GameType, PlayerIdentity, VenueKey,
};

pub const START: i64 = 1_700_000_000;

/// Strategy that replays scripted multipliers, then loses
pub struct Scripted {
    game: GameType,
    queue: Mutex<VecDeque<u64>>,
}

impl Scripted {
    pub fn new(game: GameType, multipliers_bps: &[u64]) -> Self {
        Self {
            game,
            queue: Mutex::new(multipliers_bps.iter().copied().collect()),
        }
    }
}

impl GameStrategy for Scripted {
    fn game_type(&self) -> GameType {
        self.game
    }

    fn validate_bet_shape(&self, _params: &GameParams) -> Result<(), ValidationError> {
        Ok(())
    }

    fn compute_outcome(&self, _params: &GameParams, _rng: &mut GameRng) -> Result<Draw, ValidationError> {
        let bps = self.queue.lock().unwrap().pop_front().unwrap_or(0);
        Ok(Draw {
            outcome_key: format!("scripted:{}", bps),
            multiplier: Multiplier::from_bps(bps),
            detail: GameDetail::Slots {
                reels: [venue_casino::games::slots::SlotSymbol::Cherry; 3],
            },
        })
    }
}

pub struct Casino {
    pub service: Arc<CasinoService>,
    pub balances: Arc<MemoryBalances>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<BroadcastNotifier>,
}

impl Casino {
    pub fn build(config: CasinoConfig, strategies: Vec<Scripted>) -> Self {
        let balances = Arc::new(MemoryBalances::new());
        let clock = Arc::new(ManualClock::at_unix(START));
        let notifier = Arc::new(BroadcastNotifier::new(64));
        let mut builder = CasinoService::builder(config)
            .store(Arc::new(MemoryStore::new()))
            .balances(balances.clone())
            .clock(clock.clone())
            .notifier(notifier.clone())
            .seed(7);
        for strategy in strategies {
            builder = builder.strategy(Box::new(strategy));
        }
        Self {
            service: Arc::new(builder.build()),
            balances,
            clock,
            notifier,
        }
    }

    pub fn scripted(game: GameType, multipliers_bps: &[u64]) -> Self {
        Self::build(
            ConfigBuilder::new().build(),
            vec![Scripted::new(game, multipliers_bps)],
        )
    }

    pub async fn cash(&self, player: &str) -> i64 {
        self.balances.balance(player, Currency::Cash).await.unwrap()
    }

    pub async fn points(&self, player: &str) -> i64 {
        self.balances.balance(player, Currency::Points).await.unwrap()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// `owner` buys the venue, then its cash is set to `bankroll`
    pub async fn own(&self, key: &VenueKey, owner: &str, bankroll: i64) {
        self.balances.set(owner, Currency::Cash, 100_000_000);
        self.service
            .claim_venue(&player(owner), key)
            .await
            .unwrap();
        self.balances.set(owner, Currency::Cash, bankroll);
    }
}

pub fn player(id: &str) -> PlayerIdentity {
    PlayerIdentity::new(id, id.to_uppercase())
}
