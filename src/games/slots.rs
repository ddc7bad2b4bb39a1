//! Three-reel slots
//!
//! Each reel is drawn independently from the same weighted strip. Only three of
//! a kind pays.

use super::{mismatch, Draw, GameDetail, GameParams, GameRng, GameStrategy, GameType, Multiplier};
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlotSymbol {
    Cherry,
    Lemon,
    Bell,
    Bar,
    Seven,
    Diamond,
}

impl SlotSymbol {
    pub const ALL: [SlotSymbol; 6] = [
        SlotSymbol::Cherry,
        SlotSymbol::Lemon,
        SlotSymbol::Bell,
        SlotSymbol::Bar,
        SlotSymbol::Seven,
        SlotSymbol::Diamond,
    ];

    pub fn weight(&self) -> u32 {
        match self {
            SlotSymbol::Cherry => 30,
            SlotSymbol::Lemon => 25,
            SlotSymbol::Bell => 20,
            SlotSymbol::Bar => 12,
            SlotSymbol::Seven => 8,
            SlotSymbol::Diamond => 5,
        }
    }

    /// Gross multiplier for three on a line
    pub fn triple_multiplier(&self) -> Multiplier {
        let times = match self {
            SlotSymbol::Cherry => 10,
            SlotSymbol::Lemon => 15,
            SlotSymbol::Bell => 25,
            SlotSymbol::Bar => 50,
            SlotSymbol::Seven => 100,
            SlotSymbol::Diamond => 250,
        };
        Multiplier::whole(times)
    }

    fn as_str(&self) -> &'static str {
        match self {
            SlotSymbol::Cherry => "cherry",
            SlotSymbol::Lemon => "lemon",
            SlotSymbol::Bell => "bell",
            SlotSymbol::Bar => "bar",
            SlotSymbol::Seven => "seven",
            SlotSymbol::Diamond => "diamond",
        }
    }
}

pub struct SlotsGame {
    strip: Vec<SlotSymbol>,
    weights: Vec<u32>,
}

impl SlotsGame {
    pub fn standard() -> Self {
        Self {
            strip: SlotSymbol::ALL.to_vec(),
            weights: SlotSymbol::ALL.iter().map(|s| s.weight()).collect(),
        }
    }

    fn spin_reel(&self, rng: &mut GameRng) -> Result<SlotSymbol, ValidationError> {
        rng.weighted(&self.weights)
            .and_then(|i| self.strip.get(i).copied())
            .ok_or_else(|| ValidationError::InvalidBet("reel strip is empty".to_string()))
    }
}

pub fn line_multiplier(reels: &[SlotSymbol; 3]) -> Multiplier {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        reels[0].triple_multiplier()
    } else {
        Multiplier::ZERO
    }
}

impl GameStrategy for SlotsGame {
    fn game_type(&self) -> GameType {
        GameType::Slots
    }

    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError> {
        match params {
            GameParams::Slots => Ok(()),
            _ => Err(mismatch(GameType::Slots, params)),
        }
    }

    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError> {
        self.validate_bet_shape(params)?;
        let reels = [
            self.spin_reel(rng)?,
            self.spin_reel(rng)?,
            self.spin_reel(rng)?,
        ];

        Ok(Draw {
            outcome_key: format!(
                "slots:{}-{}-{}",
                reels[0].as_str(),
                reels[1].as_str(),
                reels[2].as_str()
            ),
            multiplier: line_multiplier(&reels),
            detail: GameDetail::Slots { reels },
        })
    }
}
