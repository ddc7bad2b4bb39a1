//! Races between settlements, claims and buy-back responses

mod common;

use common::{player, Casino, Scripted};
use venue_casino::config::ConfigBuilder;
use futures::future::join_all;
use venue_casino::common::types::{BuyBackDecision, PlaceWager, RespondBuyBack};
use venue_casino::games::roulette::RouletteBet;
use venue_casino::{Currency, GameParams, GameType, ShortfallPolicy, VenueKey, WagerState};

fn dozen(key: &VenueKey, stake: i64) -> PlaceWager {
    PlaceWager {
        venue: key.clone(),
        stake,
        params: GameParams::Roulette {
            bet: RouletteBet::Dozen { dozen: 1 },
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_winners_never_overdraw_owner() {
    let winners = 20;
    // the owner stays liable for every win, so all payouts beyond stakes come from them
    let config = ConfigBuilder::new()
        .shortfall_policy(GameType::Roulette, ShortfallPolicy::KeepOwner)
        .build();
    let casino = Casino::build(
        config,
        vec![Scripted::new(GameType::Roulette, &vec![30_000; winners])],
    );
    let key = VenueKey::new(GameType::Roulette, "monaco");
    casino.own(&key, "bob", 25_000).await;

    for i in 0..winners {
        casino
            .balances
            .set(&format!("p{}", i), Currency::Cash, 1_000);
    }

    let tasks = (0..winners).map(|i| {
        let service = casino.service.clone();
        let key = key.clone();
        tokio::spawn(async move {
            service
                .place_wager(&player(&format!("p{}", i)), dozen(&key, 1_000))
                .await
                .unwrap()
        })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let paid_by_owner: i64 = outcomes.iter().map(|o| o.actual_payout - o.stake).sum();
    assert_eq!(paid_by_owner, 25_000);
    assert_eq!(casino.cash("bob").await, 0);

    let mut players_total = 0;
    for i in 0..winners {
        let cash = casino.cash(&format!("p{}", i)).await;
        assert!(cash >= 1_000);
        players_total += cash;
    }
    // money is conserved: what players gained, the owner lost
    assert_eq!(players_total, winners as i64 * 1_000 + 25_000);
    assert!(outcomes.iter().any(|o| o.state == WagerState::WonFull));
    assert!(outcomes.iter().any(|o| o.shortfall > 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_only_one_concurrent_claim_wins() {
    let casino = Casino::scripted(GameType::Dice, &[]);
    let key = VenueKey::new(GameType::Dice, "macau");
    let claimants = 10;
    for i in 0..claimants {
        casino
            .balances
            .set(&format!("c{}", i), Currency::Cash, 2_000_000);
    }

    let tasks = (0..claimants).map(|i| {
        let service = casino.service.clone();
        let key = key.clone();
        tokio::spawn(async move { service.claim_venue(&player(&format!("c{}", i)), &key).await })
    });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let mut total = 0;
    for i in 0..claimants {
        total += casino.cash(&format!("c{}", i)).await;
    }
    assert_eq!(total, claimants as i64 * 2_000_000 - 1_000_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_accept_and_reject_race_resolves_once() {
    let casino = Casino::scripted(GameType::Roulette, &[360_000]);
    let key = VenueKey::new(GameType::Roulette, "lisbon");
    casino.own(&key, "bob", 0).await;
    casino
        .service
        .set_buy_back_reward(&player("bob"), &key, 5_000)
        .await
        .unwrap();
    casino.balances.set("bob", Currency::Points, 5_000);
    casino.balances.set("alice", Currency::Cash, 1_000);

    let offer = casino
        .service
        .place_wager(
            &player("alice"),
            PlaceWager {
                venue: key.clone(),
                stake: 1_000,
                params: GameParams::Roulette {
                    bet: RouletteBet::Straight { number: 5 },
                },
            },
        )
        .await
        .unwrap()
        .buy_back_offer
        .unwrap();

    let tasks = [BuyBackDecision::Accept, BuyBackDecision::Reject, BuyBackDecision::Accept]
        .into_iter()
        .map(|decision| {
            let service = casino.service.clone();
            let offer_id = offer.id.clone();
            tokio::spawn(async move {
                service
                    .respond_buy_back(&player("alice"), RespondBuyBack { offer_id, decision })
                    .await
            })
        });
    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let points_moved = casino.points("alice").await;
    assert!(points_moved == 0 || points_moved == 5_000);
    assert_eq!(casino.points("bob").await + points_moved, 5_000);
}
