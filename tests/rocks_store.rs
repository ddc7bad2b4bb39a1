//! RocksDB store behaviour and persistence across reopen

use chrono::{Duration, TimeZone, Utc};
use std::collections::BTreeSet;
use tempfile::TempDir;
use venue_casino::common::types::{BuyBackOffer, HistoryEntry, Venue, WagerState};
use venue_casino::storage::{CasinoStore, RocksStore, VenueGuard, VenuePatch};
use venue_casino::{GameType, VenueKey};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap()
}

fn offer(id: &str, key: &VenueKey, expires: i64) -> BuyBackOffer {
    BuyBackOffer {
        id: id.into(),
        venue: key.clone(),
        previous_owner: "bob".into(),
        new_owner: "alice".into(),
        points_offered: 5_000,
        amount_shortfall: 100,
        owner_paid: 10,
        created_at: at(0),
        expires_at: at(expires),
    }
}

#[tokio::test]
async fn test_venue_guards_and_persistence() {
    let dir = TempDir::new().unwrap();
    let key = VenueKey::new(GameType::Roulette, "paris");
    {
        let store = RocksStore::open(dir.path()).unwrap();
        let venue = store
            .insert_venue_if_absent(Venue::house(key.clone(), 5_000, None))
            .await
            .unwrap();
        assert_eq!(venue.version, 0);

        // a second insert keeps the first record
        let again = store
            .insert_venue_if_absent(Venue::house(key.clone(), 1, None))
            .await
            .unwrap();
        assert_eq!(again.max_bet, 5_000);

        let claimed = store
            .update_venue(
                &key,
                VenueGuard::OwnerIs(None),
                VenuePatch::Reassign {
                    owner: Some("bob".into()),
                    expires_at: None,
                    reset_ledger: true,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(claimed.is_owned_by("bob"));

        assert!(store
            .update_venue(
                &key,
                VenueGuard::OwnerIs(None),
                VenuePatch::Reassign {
                    owner: Some("carol".into()),
                    expires_at: None,
                    reset_ledger: true,
                },
            )
            .await
            .unwrap()
            .is_none());

        store
            .update_venue(&key, VenueGuard::Any, VenuePatch::AddProfit(250))
            .await
            .unwrap();
    }

    let store = RocksStore::open(dir.path()).unwrap();
    let venue = store.load_venue(&key).await.unwrap().unwrap();
    assert!(venue.is_owned_by("bob"));
    assert_eq!(venue.profit, 250);
    assert_eq!(
        store.venues_owned_by("bob", GameType::Roulette).await.unwrap().len(),
        1
    );
    assert!(store
        .venues_owned_by("bob", GameType::Dice)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_one_live_offer_per_venue() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let key = VenueKey::new(GameType::Dice, "oslo");

    assert!(store.insert_offer(offer("a", &key, 120), at(0)).await.unwrap());
    assert!(!store.insert_offer(offer("b", &key, 120), at(10)).await.unwrap());

    // once expired it can be replaced
    assert!(store.insert_offer(offer("c", &key, 300), at(200)).await.unwrap());
    assert!(store.load_offer("a").await.unwrap().is_none());
    assert_eq!(store.offer_for_venue(&key).await.unwrap().unwrap().id, "c");
    assert_eq!(store.offers_for_player("alice").await.unwrap().len(), 1);

    let taken = store.take_offer("c").await.unwrap();
    assert!(taken.is_some());
    assert!(store.take_offer("c").await.unwrap().is_none());
    assert!(store.offer_for_venue(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_lottery_pool_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let key = VenueKey::new(GameType::Slots, "reno");

    assert!(store.add_entrant(&key, "alice").await.unwrap());
    assert!(!store.add_entrant(&key, "alice").await.unwrap());
    assert!(store.add_entrant(&key, "carol").await.unwrap());

    let pool = store.load_pool(&key).await.unwrap();
    let snapshot: BTreeSet<String> = pool.entrants.clone();
    store.add_entrant(&key, "late").await.unwrap();

    store
        .complete_draw(&key, &snapshot, &[("bob".to_string(), at(500))], at(100))
        .await
        .unwrap();
    let pool = store.load_pool(&key).await.unwrap();
    assert_eq!(pool.entrants.iter().collect::<Vec<_>>(), vec!["late"]);
    assert_eq!(pool.cooling_down_until("bob", at(100)), Some(at(500)));
}

#[tokio::test]
async fn test_history_is_bounded_and_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let key = VenueKey::new(GameType::Blackjack, "vegas");

    for i in 0..5 {
        let entry = HistoryEntry {
            wager_id: format!("w{}", i),
            venue: key.clone(),
            display_name: "Alice".into(),
            stake: 10,
            actual_payout: 0,
            shortfall: 0,
            outcome_key: "blackjack:lose".into(),
            state: WagerState::Lost,
            at: at(i) + Duration::seconds(1),
        };
        store
            .push_history("alice", GameType::Blackjack, entry, 3)
            .await
            .unwrap();
    }

    let history = store
        .recent_history("alice", GameType::Blackjack, 10)
        .await
        .unwrap();
    let ids: Vec<_> = history.iter().map(|h| h.wager_id.as_str()).collect();
    assert_eq!(ids, vec!["w4", "w3", "w2"]);
    assert!(store
        .recent_history("alice", GameType::Dice, 10)
        .await
        .unwrap()
        .is_empty());
}
