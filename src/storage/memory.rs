//! In-memory store
//!
//! Venue, pool and history records live in `DashMap`s so each update holds a
//! single shard lock. Offers need a secondary per-venue index kept in step with
//! the primary map, so both sit behind one mutex.

use super::{finish_pool, CasinoStore, VenueGuard, VenuePatch};
use crate::common::types::{BuyBackOffer, HistoryEntry, LotteryPool, PlayerId, Venue};
use crate::errors::CasinoResult;
use crate::games::types::{GameType, VenueKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap, VecDeque};
use tokio::sync::Mutex;

#[derive(Default)]
struct OfferBook {
    by_id: HashMap<String, BuyBackOffer>,
    by_venue: HashMap<VenueKey, String>,
}

impl OfferBook {
    fn remove(&mut self, id: &str) -> Option<BuyBackOffer> {
        let offer = self.by_id.remove(id)?;
        if self.by_venue.get(&offer.venue).map(String::as_str) == Some(id) {
            self.by_venue.remove(&offer.venue);
        }
        Some(offer)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    venues: DashMap<VenueKey, Venue>,
    offers: Mutex<OfferBook>,
    pools: DashMap<VenueKey, LotteryPool>,
    history: DashMap<(PlayerId, GameType), VecDeque<HistoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CasinoStore for MemoryStore {
    async fn load_venue(&self, key: &VenueKey) -> CasinoResult<Option<Venue>> {
        Ok(self.venues.get(key).map(|v| v.clone()))
    }

    async fn insert_venue_if_absent(&self, venue: Venue) -> CasinoResult<Venue> {
        Ok(self
            .venues
            .entry(venue.key.clone())
            .or_insert(venue)
            .clone())
    }

    async fn update_venue(
        &self,
        key: &VenueKey,
        guard: VenueGuard,
        patch: VenuePatch,
    ) -> CasinoResult<Option<Venue>> {
        let Some(mut venue) = self.venues.get_mut(key) else {
            return Ok(None);
        };
        if !guard.admits(&venue) {
            return Ok(None);
        }
        patch.apply(&mut venue);
        Ok(Some(venue.clone()))
    }

    async fn venues_owned_by(&self, player: &str, game_type: GameType) -> CasinoResult<Vec<Venue>> {
        Ok(self
            .venues
            .iter()
            .filter(|v| v.key.game_type == game_type && v.is_owned_by(player))
            .map(|v| v.clone())
            .collect())
    }

    async fn insert_offer(&self, offer: BuyBackOffer, now: DateTime<Utc>) -> CasinoResult<bool> {
        let mut book = self.offers.lock().await;
        if let Some(existing_id) = book.by_venue.get(&offer.venue).cloned() {
            let live = book
                .by_id
                .get(&existing_id)
                .map_or(false, |existing| existing.is_live(now));
            if live {
                return Ok(false);
            }
            book.remove(&existing_id);
        }
        book.by_venue.insert(offer.venue.clone(), offer.id.clone());
        book.by_id.insert(offer.id.clone(), offer);
        Ok(true)
    }

    async fn load_offer(&self, id: &str) -> CasinoResult<Option<BuyBackOffer>> {
        Ok(self.offers.lock().await.by_id.get(id).cloned())
    }

    async fn take_offer(&self, id: &str) -> CasinoResult<Option<BuyBackOffer>> {
        Ok(self.offers.lock().await.remove(id))
    }

    async fn offer_for_venue(&self, key: &VenueKey) -> CasinoResult<Option<BuyBackOffer>> {
        let book = self.offers.lock().await;
        Ok(book
            .by_venue
            .get(key)
            .and_then(|id| book.by_id.get(id))
            .cloned())
    }

    async fn offers_for_player(&self, player: &str) -> CasinoResult<Vec<BuyBackOffer>> {
        let book = self.offers.lock().await;
        let mut offers: Vec<BuyBackOffer> = book
            .by_id
            .values()
            .filter(|o| o.new_owner == player)
            .cloned()
            .collect();
        offers.sort_by_key(|o| o.created_at);
        Ok(offers)
    }

    async fn load_pool(&self, key: &VenueKey) -> CasinoResult<LotteryPool> {
        Ok(self.pools.get(key).map(|p| p.clone()).unwrap_or_default())
    }

    async fn add_entrant(&self, key: &VenueKey, player: &str) -> CasinoResult<bool> {
        let mut pool = self.pools.entry(key.clone()).or_default();
        Ok(pool.entrants.insert(player.to_string()))
    }

    async fn set_cooldown(
        &self,
        key: &VenueKey,
        player: &str,
        until: DateTime<Utc>,
    ) -> CasinoResult<()> {
        let mut pool = self.pools.entry(key.clone()).or_default();
        pool.entrants.remove(player);
        pool.cooldowns.insert(player.to_string(), until);
        Ok(())
    }

    async fn complete_draw(
        &self,
        key: &VenueKey,
        drawn: &BTreeSet<PlayerId>,
        cooldowns: &[(PlayerId, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> CasinoResult<()> {
        let mut pool = self.pools.entry(key.clone()).or_default();
        finish_pool(&mut pool, drawn, cooldowns, now);
        Ok(())
    }

    async fn push_history(
        &self,
        player: &str,
        game_type: GameType,
        entry: HistoryEntry,
        limit: usize,
    ) -> CasinoResult<()> {
        let mut entries = self
            .history
            .entry((player.to_string(), game_type))
            .or_default();
        entries.push_front(entry);
        entries.truncate(limit);
        Ok(())
    }

    async fn recent_history(
        &self,
        player: &str,
        game_type: GameType,
        limit: usize,
    ) -> CasinoResult<Vec<HistoryEntry>> {
        Ok(self
            .history
            .get(&(player.to_string(), game_type))
            .map(|entries| entries.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::WagerState;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    fn key() -> VenueKey {
        VenueKey::new(GameType::Roulette, "paris")
    }

    fn offer(id: &str, created: i64) -> BuyBackOffer {
        BuyBackOffer {
            id: id.to_string(),
            venue: key(),
            previous_owner: "bob".into(),
            new_owner: "winner".into(),
            points_offered: 5_000,
            amount_shortfall: 100,
            owner_paid: 50,
            created_at: at(created),
            expires_at: at(created) + Duration::seconds(120),
        }
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first_record() {
        let store = MemoryStore::new();
        let first = store
            .insert_venue_if_absent(Venue::house(key(), 1_000, None))
            .await
            .unwrap();
        let second = store
            .insert_venue_if_absent(Venue::house(key(), 9_999, None))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(second.max_bet, 1_000);
    }

    #[tokio::test]
    async fn test_guarded_update() {
        let store = MemoryStore::new();
        store
            .insert_venue_if_absent(Venue::house(key(), 1_000, None))
            .await
            .unwrap();

        let claim = VenuePatch::Reassign {
            owner: Some("bob".into()),
            expires_at: None,
            reset_ledger: true,
        };
        let first = store
            .update_venue(&key(), VenueGuard::OwnerIs(None), claim.clone())
            .await
            .unwrap();
        assert!(first.is_some());
        let second = store
            .update_venue(&key(), VenueGuard::OwnerIs(None), claim)
            .await
            .unwrap();
        assert!(second.is_none());

        let missing = VenueKey::new(GameType::Dice, "nowhere");
        assert!(store
            .update_venue(&missing, VenueGuard::Any, VenuePatch::AddProfit(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_one_live_offer_per_venue() {
        let store = MemoryStore::new();
        assert!(store.insert_offer(offer("o1", 0), at(0)).await.unwrap());
        assert!(!store.insert_offer(offer("o2", 10), at(10)).await.unwrap());

        // once the first has lapsed it is replaced
        assert!(store.insert_offer(offer("o3", 200), at(200)).await.unwrap());
        assert!(store.load_offer("o1").await.unwrap().is_none());
        assert_eq!(
            store.offer_for_venue(&key()).await.unwrap().map(|o| o.id),
            Some("o3".to_string())
        );
    }

    #[tokio::test]
    async fn test_take_offer_is_single_shot() {
        let store = MemoryStore::new();
        store.insert_offer(offer("o1", 0), at(0)).await.unwrap();
        assert!(store.take_offer("o1").await.unwrap().is_some());
        assert!(store.take_offer("o1").await.unwrap().is_none());
        assert!(store.offer_for_venue(&key()).await.unwrap().is_none());
        assert!(store.offers_for_player("winner").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_newest_first() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let entry = HistoryEntry {
                wager_id: format!("w{}", i),
                venue: key(),
                display_name: "Alice".into(),
                stake: 10,
                actual_payout: 0,
                shortfall: 0,
                outcome_key: "roulette:0".into(),
                state: WagerState::Lost,
                at: at(i),
            };
            store
                .push_history("alice", GameType::Roulette, entry, 3)
                .await
                .unwrap();
        }
        let recent = store
            .recent_history("alice", GameType::Roulette, 10)
            .await
            .unwrap();
        let ids: Vec<_> = recent.iter().map(|e| e.wager_id.as_str()).collect();
        assert_eq!(ids, vec!["w4", "w3", "w2"]);
        assert!(store
            .recent_history("alice", GameType::Dice, 10)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_cooldown_removes_entrant() {
        let store = MemoryStore::new();
        assert!(store.add_entrant(&key(), "carol").await.unwrap());
        assert!(!store.add_entrant(&key(), "carol").await.unwrap());
        store.set_cooldown(&key(), "carol", at(100)).await.unwrap();
        let pool = store.load_pool(&key()).await.unwrap();
        assert!(pool.entrants.is_empty());
        assert_eq!(pool.cooling_down_until("carol", at(0)), Some(at(100)));
    }
}
