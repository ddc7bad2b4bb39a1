//! Settlement counters exposed in Prometheus text format

use crate::common::types::WagerState;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct SettlementMetrics {
    start_time: Instant,
    wagers_lost: AtomicU64,
    wagers_won_full: AtomicU64,
    wagers_shortfall_absorbed: AtomicU64,
    wagers_shortfall_transferred: AtomicU64,
    stake_volume: AtomicU64,
    paid_volume: AtomicU64,
    shortfall_volume: AtomicU64,
    offers_created: AtomicU64,
    offers_accepted: AtomicU64,
    offers_rejected: AtomicU64,
    offers_expired: AtomicU64,
    lottery_draws: AtomicU64,
    lottery_draws_empty: AtomicU64,
    claims: AtomicU64,
    relinquishes: AtomicU64,
}

impl Default for SettlementMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn add(counter: &AtomicU64, amount: i64) {
    counter.fetch_add(amount.max(0) as u64, Ordering::Relaxed);
}

impl SettlementMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            wagers_lost: AtomicU64::new(0),
            wagers_won_full: AtomicU64::new(0),
            wagers_shortfall_absorbed: AtomicU64::new(0),
            wagers_shortfall_transferred: AtomicU64::new(0),
            stake_volume: AtomicU64::new(0),
            paid_volume: AtomicU64::new(0),
            shortfall_volume: AtomicU64::new(0),
            offers_created: AtomicU64::new(0),
            offers_accepted: AtomicU64::new(0),
            offers_rejected: AtomicU64::new(0),
            offers_expired: AtomicU64::new(0),
            lottery_draws: AtomicU64::new(0),
            lottery_draws_empty: AtomicU64::new(0),
            claims: AtomicU64::new(0),
            relinquishes: AtomicU64::new(0),
        }
    }

    pub fn record_wager(&self, state: WagerState, stake: i64, paid: i64, shortfall: i64) {
        let counter = match state {
            WagerState::Lost => &self.wagers_lost,
            WagerState::WonFull => &self.wagers_won_full,
            WagerState::WonShortfallAbsorbed => &self.wagers_shortfall_absorbed,
            WagerState::WonShortfallTransferred => &self.wagers_shortfall_transferred,
            WagerState::Staked => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        add(&self.stake_volume, stake);
        add(&self.paid_volume, paid);
        add(&self.shortfall_volume, shortfall);
    }

    pub fn record_offer_created(&self) {
        self.offers_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offer_accepted(&self) {
        self.offers_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offer_rejected(&self) {
        self.offers_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_offer_expired(&self) {
        self.offers_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lottery_draw(&self, had_winner: bool) {
        self.lottery_draws.fetch_add(1, Ordering::Relaxed);
        if !had_winner {
            self.lottery_draws_empty.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_claim(&self) {
        self.claims.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_relinquish(&self) {
        self.relinquishes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn wagers(&self, state: WagerState) -> u64 {
        match state {
            WagerState::Lost => self.wagers_lost.load(Ordering::Relaxed),
            WagerState::WonFull => self.wagers_won_full.load(Ordering::Relaxed),
            WagerState::WonShortfallAbsorbed => self.wagers_shortfall_absorbed.load(Ordering::Relaxed),
            WagerState::WonShortfallTransferred => {
                self.wagers_shortfall_transferred.load(Ordering::Relaxed)
            }
            WagerState::Staked => 0,
        }
    }

    pub fn offers_expired(&self) -> u64 {
        self.offers_expired.load(Ordering::Relaxed)
    }

    pub fn lottery_draws(&self) -> u64 {
        self.lottery_draws.load(Ordering::Relaxed)
    }

    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let _ = write!(
            output,
            "# HELP venue_casino_uptime_seconds Seconds since the engine started\n\
             # TYPE venue_casino_uptime_seconds gauge\n\
             venue_casino_uptime_seconds {}\n\n",
            self.start_time.elapsed().as_secs()
        );

        output.push_str(
            "# HELP venue_casino_wagers_total Settled wagers by terminal state\n\
             # TYPE venue_casino_wagers_total counter\n",
        );
        for state in [
            WagerState::Lost,
            WagerState::WonFull,
            WagerState::WonShortfallAbsorbed,
            WagerState::WonShortfallTransferred,
        ] {
            let _ = writeln!(
                output,
                "venue_casino_wagers_total{{state=\"{}\"}} {}",
                state.as_str(),
                self.wagers(state)
            );
        }
        output.push('\n');

        for (name, help, counter) in [
            ("stake_volume_total", "Cash staked", &self.stake_volume),
            ("paid_volume_total", "Cash paid to winners including returned stakes", &self.paid_volume),
            ("shortfall_volume_total", "Winnings owners could not cover", &self.shortfall_volume),
            ("claims_total", "Venues claimed", &self.claims),
            ("relinquishes_total", "Venues relinquished", &self.relinquishes),
        ] {
            let _ = write!(
                output,
                "# HELP venue_casino_{name} {help}\n\
                 # TYPE venue_casino_{name} counter\n\
                 venue_casino_{name} {}\n\n",
                counter.load(Ordering::Relaxed)
            );
        }

        output.push_str(
            "# HELP venue_casino_buy_back_offers_total Buy-back offers by outcome\n\
             # TYPE venue_casino_buy_back_offers_total counter\n",
        );
        for (outcome, counter) in [
            ("created", &self.offers_created),
            ("accepted", &self.offers_accepted),
            ("rejected", &self.offers_rejected),
            ("expired", &self.offers_expired),
        ] {
            let _ = writeln!(
                output,
                "venue_casino_buy_back_offers_total{{outcome=\"{}\"}} {}",
                outcome,
                counter.load(Ordering::Relaxed)
            );
        }
        output.push('\n');

        let _ = write!(
            output,
            "# HELP venue_casino_lottery_draws_total Lottery draws, split by whether anyone won\n\
             # TYPE venue_casino_lottery_draws_total counter\n\
             venue_casino_lottery_draws_total{{result=\"owner\"}} {}\n\
             venue_casino_lottery_draws_total{{result=\"empty\"}} {}\n",
            self.lottery_draws
                .load(Ordering::Relaxed)
                .saturating_sub(self.lottery_draws_empty.load(Ordering::Relaxed)),
            self.lottery_draws_empty.load(Ordering::Relaxed)
        );

        output
    }
}
