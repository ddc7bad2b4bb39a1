//! Record storage for venues, buy-back offers, lottery pools and wager history
//!
//! Every mutation is a single-record atomic operation. Cross-record sequences
//! (settlement, buy-back accept) are built from these by the callers and are
//! never wrapped in a transaction.

pub mod balances;
pub mod memory;
pub mod rocks;

pub use balances::{BalanceProvider, MemoryBalances};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::common::types::{BuyBackOffer, HistoryEntry, LotteryPool, PlayerId, Venue};
use crate::errors::CasinoResult;
use crate::games::types::{GameType, VenueKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Precondition checked atomically with a venue patch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenueGuard {
    Any,
    /// Current owner must equal this value (`None` = unowned)
    OwnerIs(Option<PlayerId>),
    /// Record version must equal this value
    Version(u64),
}

impl VenueGuard {
    pub fn admits(&self, venue: &Venue) -> bool {
        match self {
            VenueGuard::Any => true,
            VenueGuard::OwnerIs(owner) => venue.owner == *owner,
            VenueGuard::Version(version) => venue.version == *version,
        }
    }
}

/// Single-record change to a venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VenuePatch {
    /// Signed ledger increment; leaves the version untouched
    AddProfit(i64),
    Reassign {
        owner: Option<PlayerId>,
        /// `None` keeps the current expiry
        expires_at: Option<DateTime<Utc>>,
        /// Zero profit and buy-back reward
        reset_ledger: bool,
    },
    SetMaxBet(i64),
    SetBuyBackReward(i64),
}

impl VenuePatch {
    pub fn apply(&self, venue: &mut Venue) {
        match self {
            VenuePatch::AddProfit(delta) => {
                venue.profit = venue.profit.saturating_add(*delta);
                return;
            }
            VenuePatch::Reassign {
                owner,
                expires_at,
                reset_ledger,
            } => {
                venue.owner = owner.clone();
                if let Some(at) = expires_at {
                    venue.expires_at = Some(*at);
                }
                if *reset_ledger {
                    venue.profit = 0;
                    venue.buy_back_reward = 0;
                }
            }
            VenuePatch::SetMaxBet(max_bet) => venue.max_bet = *max_bet,
            VenuePatch::SetBuyBackReward(amount) => venue.buy_back_reward = *amount,
        }
        venue.version += 1;
    }
}

/// Document store behind the engine
#[async_trait]
pub trait CasinoStore: Send + Sync {
    async fn load_venue(&self, key: &VenueKey) -> CasinoResult<Option<Venue>>;

    /// Insert `venue` unless a record exists; returns whichever record is stored
    async fn insert_venue_if_absent(&self, venue: Venue) -> CasinoResult<Venue>;

    /// Apply `patch` if `guard` admits the current record.
    /// Returns the updated record, or `None` when the guard failed or the venue is missing.
    async fn update_venue(
        &self,
        key: &VenueKey,
        guard: VenueGuard,
        patch: VenuePatch,
    ) -> CasinoResult<Option<Venue>>;

    async fn venues_owned_by(&self, player: &str, game_type: GameType) -> CasinoResult<Vec<Venue>>;

    /// Insert unless a live offer exists for the same venue.
    /// An expired offer for the venue is replaced.
    async fn insert_offer(&self, offer: BuyBackOffer, now: DateTime<Utc>) -> CasinoResult<bool>;

    async fn load_offer(&self, id: &str) -> CasinoResult<Option<BuyBackOffer>>;

    /// Atomically remove an offer; only one caller ever receives it
    async fn take_offer(&self, id: &str) -> CasinoResult<Option<BuyBackOffer>>;

    async fn offer_for_venue(&self, key: &VenueKey) -> CasinoResult<Option<BuyBackOffer>>;

    /// Offers awaiting a response from `player`
    async fn offers_for_player(&self, player: &str) -> CasinoResult<Vec<BuyBackOffer>>;

    async fn load_pool(&self, key: &VenueKey) -> CasinoResult<LotteryPool>;

    /// Returns false when the player was already entered
    async fn add_entrant(&self, key: &VenueKey, player: &str) -> CasinoResult<bool>;

    async fn set_cooldown(
        &self,
        key: &VenueKey,
        player: &str,
        until: DateTime<Utc>,
    ) -> CasinoResult<()>;

    /// Remove the drawn entrants and record new cooldowns.
    /// Entrants who joined after the snapshot stay in the pool.
    async fn complete_draw(
        &self,
        key: &VenueKey,
        drawn: &BTreeSet<PlayerId>,
        cooldowns: &[(PlayerId, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> CasinoResult<()>;

    /// Prepend an entry and truncate to `limit`
    async fn push_history(
        &self,
        player: &str,
        game_type: GameType,
        entry: HistoryEntry,
        limit: usize,
    ) -> CasinoResult<()>;

    /// Newest first
    async fn recent_history(
        &self,
        player: &str,
        game_type: GameType,
        limit: usize,
    ) -> CasinoResult<Vec<HistoryEntry>>;
}

/// Shared by both stores; cooldowns that elapsed before `now` are dropped
pub(crate) fn finish_pool(
    pool: &mut LotteryPool,
    drawn: &BTreeSet<PlayerId>,
    cooldowns: &[(PlayerId, DateTime<Utc>)],
    now: DateTime<Utc>,
) {
    pool.entrants.retain(|p| !drawn.contains(p));
    pool.cooldowns.retain(|_, until| *until > now);
    for (player, until) in cooldowns {
        pool.cooldowns.insert(player.clone(), *until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn venue() -> Venue {
        Venue::house(VenueKey::new(GameType::Roulette, "paris"), 5_000, None)
    }

    #[test]
    fn test_guard_owner_and_version() {
        let mut v = venue();
        assert!(VenueGuard::OwnerIs(None).admits(&v));
        v.owner = Some("bob".into());
        assert!(!VenueGuard::OwnerIs(None).admits(&v));
        assert!(VenueGuard::OwnerIs(Some("bob".into())).admits(&v));
        assert!(VenueGuard::Version(0).admits(&v));
        assert!(!VenueGuard::Version(1).admits(&v));
    }

    #[test]
    fn test_profit_patch_keeps_version() {
        let mut v = venue();
        VenuePatch::AddProfit(-250).apply(&mut v);
        assert_eq!(v.profit, -250);
        assert_eq!(v.version, 0);
    }

    #[test]
    fn test_reassign_resets_ledger_and_bumps_version() {
        let mut v = venue();
        v.profit = 900;
        v.buy_back_reward = 5_000;
        let expiry = Utc.timestamp_opt(1_000, 0).single().unwrap();
        VenuePatch::Reassign {
            owner: Some("winner".into()),
            expires_at: Some(expiry),
            reset_ledger: true,
        }
        .apply(&mut v);
        assert_eq!(v.owner.as_deref(), Some("winner"));
        assert_eq!(v.expires_at, Some(expiry));
        assert_eq!((v.profit, v.buy_back_reward), (0, 0));
        assert_eq!(v.version, 1);
    }

    #[test]
    fn test_finish_pool_keeps_late_entrants() {
        let at = |s| Utc.timestamp_opt(s, 0).single().unwrap();
        let mut pool = LotteryPool::default();
        pool.entrants.extend(["a".to_string(), "b".to_string(), "late".to_string()]);
        pool.cooldowns.insert("stale".into(), at(10));
        let drawn: BTreeSet<PlayerId> = ["a".to_string(), "b".to_string()].into();
        finish_pool(&mut pool, &drawn, &[("a".into(), at(500))], at(100));
        assert_eq!(pool.entrants.len(), 1);
        assert!(pool.entrants.contains("late"));
        assert!(!pool.cooldowns.contains_key("stale"));
        assert_eq!(pool.cooldowns.get("a"), Some(&at(500)));
    }

    #[test]
    fn test_reassign_can_keep_expiry() {
        let mut v = venue();
        let expiry = Utc.timestamp_opt(50, 0).single().unwrap();
        v.expires_at = Some(expiry);
        VenuePatch::Reassign {
            owner: None,
            expires_at: None,
            reset_ledger: false,
        }
        .apply(&mut v);
        assert_eq!(v.expires_at, Some(expiry));
    }
}
