//! Lottery ownership for slot venues
//!
//! There is no background timer. A lottery venue whose term has run out is
//! redrawn by whichever request touches it next; the venue version decides
//! which of several concurrent requests performs the draw.

use crate::common::types::{LotteryEntry, PlayerId, Venue};
use crate::common::Clock;
use crate::config::CasinoConfig;
use crate::errors::{CasinoResult, StorageError, ValidationError};
use crate::games::rng::GameRng;
use crate::games::types::VenueKey;
use crate::metrics::SettlementMetrics;
use crate::storage::{CasinoStore, VenueGuard};
use crate::venues::VenueRegistry;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const MAX_DRAW_ATTEMPTS: usize = 8;

pub struct LotteryScheduler {
    registry: Arc<VenueRegistry>,
    store: Arc<dyn CasinoStore>,
    config: Arc<CasinoConfig>,
    clock: Arc<dyn Clock>,
    metrics: Arc<SettlementMetrics>,
    rng: Mutex<GameRng>,
}

impl LotteryScheduler {
    pub fn new(
        registry: Arc<VenueRegistry>,
        store: Arc<dyn CasinoStore>,
        config: Arc<CasinoConfig>,
        clock: Arc<dyn Clock>,
        metrics: Arc<SettlementMetrics>,
        rng: GameRng,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            clock,
            metrics,
            rng: Mutex::new(rng),
        }
    }

    fn pick(&self, eligible: &[PlayerId]) -> Option<PlayerId> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.pick(eligible).cloned()
    }

    /// Load the venue, running an overdue draw first
    pub async fn refresh(&self, key: &VenueKey) -> CasinoResult<Venue> {
        let venue = self.registry.get_or_create(key).await?;
        if !venue.term_expired(self.clock.now()) {
            return Ok(venue);
        }
        self.draw(venue).await
    }

    async fn draw(&self, mut venue: Venue) -> CasinoResult<Venue> {
        let key = venue.key.clone();
        for _ in 0..MAX_DRAW_ATTEMPTS {
            let now = self.clock.now();
            let pool = self.store.load_pool(&key).await?;
            let previous = venue.owner.clone();

            let eligible: Vec<PlayerId> = pool
                .entrants
                .iter()
                .filter(|p| previous.as_deref() != Some(p.as_str()))
                .filter(|p| pool.cooling_down_until(p, now).is_none())
                .cloned()
                .collect();
            let winner = self.pick(&eligible);
            let term_end = now + self.config.lottery.term();

            let drawn = self
                .registry
                .reassign(
                    &key,
                    VenueGuard::Version(venue.version),
                    winner.clone(),
                    Some(term_end),
                    true,
                )
                .await?;

            match drawn {
                Some(updated) => {
                    let cooldowns: Vec<_> = previous
                        .iter()
                        .map(|p| (p.clone(), term_end))
                        .collect();
                    self.store
                        .complete_draw(&key, &pool.entrants, &cooldowns, now)
                        .await?;
                    self.metrics.record_lottery_draw(winner.is_some());
                    info!(
                        venue = %key,
                        previous_owner = ?previous,
                        winner = ?winner,
                        entrants = pool.entrants.len(),
                        eligible = eligible.len(),
                        "lottery drawn"
                    );
                    return Ok(updated);
                }
                None => {
                    // someone else changed the venue first; re-read and decide again
                    let current = self.store.load_venue(&key).await?.ok_or_else(|| {
                        StorageError::ReadFailed(format!("venue {} vanished during draw", key))
                    })?;
                    if !current.term_expired(self.clock.now()) {
                        debug!(venue = %key, "lottery already drawn by a concurrent request");
                        return Ok(current);
                    }
                    venue = current;
                }
            }
        }
        Err(StorageError::WriteFailed(format!("lottery draw for {} kept conflicting", key)).into())
    }

    /// Join the pool for the next draw
    pub async fn enter(&self, key: &VenueKey, player: &str) -> CasinoResult<LotteryEntry> {
        if !key.game_type.is_lottery() {
            return Err(ValidationError::NotLotteryVenue(key.clone()).into());
        }
        let venue = self.refresh(key).await?;
        if venue.is_owned_by(player) {
            return Ok(LotteryEntry::IsOwner);
        }

        let pool = self.store.load_pool(key).await?;
        if let Some(until) = pool.cooling_down_until(player, self.clock.now()) {
            return Ok(LotteryEntry::CoolingDown { until });
        }
        if self.store.add_entrant(key, player).await? {
            debug!(venue = %key, player, "entered lottery");
            Ok(LotteryEntry::Entered)
        } else {
            Ok(LotteryEntry::AlreadyEntered)
        }
    }

    pub async fn entrant_count(&self, key: &VenueKey) -> CasinoResult<usize> {
        Ok(self.store.load_pool(key).await?.entrants.len())
    }
}
