use crate::errors::ValidationError;
use crate::games::{
    blackjack::{BlackjackAction, BlackjackResult},
    roulette::RouletteBet,
    slots::SlotSymbol,
    video_poker::{HoldStrategy, PokerHand},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Dice,
    Roulette,
    Blackjack,
    HorseRacing,
    VideoPoker,
    Slots,
}

impl GameType {
    pub const ALL: [GameType; 6] = [
        GameType::Dice,
        GameType::Roulette,
        GameType::Blackjack,
        GameType::HorseRacing,
        GameType::VideoPoker,
        GameType::Slots,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::Dice => "dice",
            GameType::Roulette => "roulette",
            GameType::Blackjack => "blackjack",
            GameType::HorseRacing => "horse_racing",
            GameType::VideoPoker => "video_poker",
            GameType::Slots => "slots",
        }
    }

    /// Lottery venues rotate ownership on a timer instead of staying with a claimant
    pub fn is_lottery(&self) -> bool {
        matches!(self, GameType::Slots)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GameType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GameType::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownGame(s.to_string()))
    }
}

/// Identifies one ownable table or machine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VenueKey {
    pub game_type: GameType,
    pub location: String,
}

impl VenueKey {
    pub fn new(game_type: GameType, location: impl Into<String>) -> Self {
        Self {
            game_type,
            location: location.into(),
        }
    }

    /// Storage key suffix, `game_type:location`
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.game_type, self.location)
    }
}

impl fmt::Display for VenueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.game_type, self.location)
    }
}

/// Gross payout multiplier in basis points (10_000 = 1x, stake returned)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Multiplier(u64);

impl Multiplier {
    pub const BPS_ONE: u64 = 10_000;
    pub const ZERO: Multiplier = Multiplier(0);

    pub fn from_bps(bps: u64) -> Self {
        Multiplier(bps)
    }

    pub fn whole(times: u64) -> Self {
        Multiplier(times * Self::BPS_ONE)
    }

    pub fn bps(&self) -> u64 {
        self.0
    }

    pub fn is_loss(&self) -> bool {
        self.0 == 0
    }

    /// Scale by `(1 - edge)`, edge in basis points
    pub fn less_edge(self, house_edge_bps: u32) -> Self {
        let keep = Self::BPS_ONE.saturating_sub(house_edge_bps as u64);
        Multiplier(self.0 * keep / Self::BPS_ONE)
    }

    /// `stake x multiplier`, rounded down
    pub fn gross_payout(&self, stake: i64) -> i64 {
        (stake as i128 * self.0 as i128 / Self::BPS_ONE as i128) as i64
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:04}x", self.0 / Self::BPS_ONE, self.0 % Self::BPS_ONE)
    }
}

/// Game-specific bet parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameParams {
    Dice {
        sides: u32,
        guess: u32,
    },
    Roulette {
        bet: RouletteBet,
    },
    Blackjack {
        #[serde(default)]
        actions: Vec<BlackjackAction>,
    },
    HorseRacing {
        horse: usize,
    },
    VideoPoker {
        #[serde(default)]
        hold: HoldStrategy,
    },
    Slots,
}

impl GameParams {
    pub fn game_type(&self) -> GameType {
        match self {
            GameParams::Dice { .. } => GameType::Dice,
            GameParams::Roulette { .. } => GameType::Roulette,
            GameParams::Blackjack { .. } => GameType::Blackjack,
            GameParams::HorseRacing { .. } => GameType::HorseRacing,
            GameParams::VideoPoker { .. } => GameType::VideoPoker,
            GameParams::Slots => GameType::Slots,
        }
    }
}

/// What the draw produced, per game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "game", rename_all = "snake_case")]
pub enum GameDetail {
    Dice {
        sides: u32,
        guess: u32,
        roll: u32,
    },
    Roulette {
        bet: RouletteBet,
        pocket: u8,
    },
    Blackjack {
        player_cards: Vec<u8>,
        dealer_cards: Vec<u8>,
        player_total: u8,
        dealer_total: u8,
        result: BlackjackResult,
    },
    HorseRacing {
        horse: usize,
        winner: usize,
        winner_name: String,
        odds: u32,
    },
    VideoPoker {
        cards: [u8; 5],
        hand: PokerHand,
    },
    Slots {
        reels: [SlotSymbol; 3],
    },
}

/// Result of a payout calculation, before any money moves
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Draw {
    pub outcome_key: String,
    pub multiplier: Multiplier,
    pub detail: GameDetail,
}
