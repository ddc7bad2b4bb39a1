//! Shared record types
//!
//! Venue, buy-back offer, lottery pool and history records as persisted, plus the
//! game-agnostic request/response shapes of the service.

use crate::games::types::{Draw, GameDetail, GameParams, GameType, Multiplier, VenueKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type PlayerId = String;

/// Balance currencies held by the external balance provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Cash,
    Points,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Cash => write!(f, "cash"),
            Currency::Points => write!(f, "points"),
        }
    }
}

/// Authenticated caller as supplied by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerIdentity {
    pub id: PlayerId,
    pub display_name: String,
}

impl PlayerIdentity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// Ownership record for one venue
///
/// `owner == None` means the venue is house-backed: payouts are funded without
/// limit and no shortfall can occur.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Venue {
    pub key: VenueKey,
    pub owner: Option<PlayerId>,
    pub max_bet: i64,
    pub buy_back_reward: i64,
    /// Informational ledger of what the current owner has won or lost here
    pub profit: i64,
    /// Lottery venues only: when the current ownership term ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Bumped on every ownership or terms change, not on profit increments
    #[serde(default)]
    pub version: u64,
}

impl Venue {
    /// House-backed record used on first access
    pub fn house(key: VenueKey, max_bet: i64, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            key,
            owner: None,
            max_bet,
            buy_back_reward: 0,
            profit: 0,
            expires_at,
            version: 0,
        }
    }

    pub fn is_house_backed(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_owned_by(&self, player: &str) -> bool {
        self.owner.as_deref() == Some(player)
    }

    /// Lottery term over: the next access must redraw
    pub fn term_expired(&self, now: DateTime<Utc>) -> bool {
        self.key.game_type.is_lottery() && self.expires_at.map_or(false, |at| now >= at)
    }
}

/// Time-limited proposal to return a forcibly acquired venue
///
/// Existence means pending; the record is deleted on accept, reject or expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyBackOffer {
    pub id: String,
    pub venue: VenueKey,
    pub previous_owner: PlayerId,
    pub new_owner: PlayerId,
    pub points_offered: i64,
    pub amount_shortfall: i64,
    pub owner_paid: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl BuyBackOffer {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Entrants and cooldowns for one lottery venue
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LotteryPool {
    pub entrants: BTreeSet<PlayerId>,
    /// Player -> end of their re-entry cooldown
    pub cooldowns: BTreeMap<PlayerId, DateTime<Utc>>,
}

impl LotteryPool {
    pub fn cooling_down_until(&self, player: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.cooldowns.get(player).copied().filter(|until| *until > now)
    }
}

/// Terminal state of one wager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WagerState {
    Staked,
    Lost,
    WonFull,
    WonShortfallAbsorbed,
    WonShortfallTransferred,
}

impl WagerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WagerState::Staked => "staked",
            WagerState::Lost => "lost",
            WagerState::WonFull => "won_full",
            WagerState::WonShortfallAbsorbed => "won_shortfall_absorbed",
            WagerState::WonShortfallTransferred => "won_shortfall_transferred",
        }
    }
}

/// Settled wager, also the response to `PlaceWager`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WagerOutcome {
    pub wager_id: String,
    pub player_id: PlayerId,
    pub venue: VenueKey,
    pub stake: i64,
    pub multiplier: Multiplier,
    pub outcome_key: String,
    pub detail: GameDetail,
    pub state: WagerState,
    /// What the paytable says the player is owed
    pub gross_payout: i64,
    /// What the player actually received
    pub actual_payout: i64,
    pub shortfall: i64,
    /// The winner became the owner
    pub ownership_transferred: bool,
    /// The owner lost the venue without it passing to the winner
    pub owner_forfeited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_back_offer: Option<BuyBackOffer>,
    pub settled_at: DateTime<Utc>,
}

impl WagerOutcome {
    pub(crate) fn staked(
        wager_id: String,
        player_id: PlayerId,
        venue: VenueKey,
        stake: i64,
        draw: Draw,
        settled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            wager_id,
            player_id,
            venue,
            stake,
            multiplier: draw.multiplier,
            outcome_key: draw.outcome_key,
            detail: draw.detail,
            state: WagerState::Staked,
            gross_payout: 0,
            actual_payout: 0,
            shortfall: 0,
            ownership_transferred: false,
            owner_forfeited: false,
            buy_back_offer: None,
            settled_at,
        }
    }

    /// Player's net balance change from this wager
    pub fn net_for_player(&self) -> i64 {
        self.actual_payout - self.stake
    }
}

/// Bounded per-player, per-game history record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub wager_id: String,
    pub venue: VenueKey,
    pub display_name: String,
    pub stake: i64,
    pub actual_payout: i64,
    pub shortfall: i64,
    pub outcome_key: String,
    pub state: WagerState,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_outcome(outcome: &WagerOutcome, display_name: &str) -> Self {
        Self {
            wager_id: outcome.wager_id.clone(),
            venue: outcome.venue.clone(),
            display_name: display_name.to_string(),
            stake: outcome.stake,
            actual_payout: outcome.actual_payout,
            shortfall: outcome.shortfall,
            outcome_key: outcome.outcome_key.clone(),
            state: outcome.state,
            at: outcome.settled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceWager {
    pub venue: VenueKey,
    pub stake: i64,
    pub params: GameParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimVenue {
    pub venue: VenueKey,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClaimResponse {
    pub owner: PlayerId,
    pub max_bet: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetMaxBet {
    pub venue: VenueKey,
    pub max_bet: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBuyBackReward {
    pub venue: VenueKey,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferVenue {
    pub venue: VenueKey,
    pub to: PlayerId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BuyBackDecision {
    Accept,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondBuyBack {
    pub offer_id: String,
    pub decision: BuyBackDecision,
}

/// How a buy-back offer ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "resolution", rename_all = "snake_case")]
pub enum BuyBackResolution {
    /// Venue returned to the previous owner, points moved to the winner
    Accepted { offer: BuyBackOffer, venue: Venue },
    /// Winner keeps the venue
    Rejected { offer: BuyBackOffer },
}

/// Result of asking to join a lottery draw
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LotteryEntry {
    Entered,
    AlreadyEntered,
    IsOwner,
    CoolingDown { until: DateTime<Utc> },
}

/// Read-model for a venue page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueStatus {
    pub venue: Venue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_offer: Option<BuyBackOffer>,
    pub lottery_entrants: usize,
}

/// Summary used by ownership listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedVenue {
    pub game_type: GameType,
    pub location: String,
    pub max_bet: i64,
    pub profit: i64,
}

impl From<&Venue> for OwnedVenue {
    fn from(venue: &Venue) -> Self {
        Self {
            game_type: venue.key.game_type,
            location: venue.key.location.clone(),
            max_bet: venue.max_bet,
            profit: venue.profit,
        }
    }
}
