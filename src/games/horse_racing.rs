//! Horse racing: back one runner from a fixed field
//!
//! Horses are numbered from 1. A runner at `odds` to 1 wins with weight
//! proportional to `1 / odds` and pays `(1 + odds) x (1 - house_edge)`.

use super::{mismatch, Draw, GameDetail, GameParams, GameRng, GameStrategy, GameType, Multiplier};
use crate::config::Runner;
use crate::errors::ValidationError;

pub struct HorseRacingGame {
    field: Vec<Runner>,
    weights: Vec<f64>,
    house_edge_bps: u32,
}

impl HorseRacingGame {
    pub fn new(field: Vec<Runner>, house_edge_bps: u32) -> Self {
        let weights = field.iter().map(|r| 1.0 / r.odds.max(1) as f64).collect();
        Self {
            field,
            weights,
            house_edge_bps,
        }
    }

    pub fn field(&self) -> &[Runner] {
        &self.field
    }

    pub fn multiplier(&self, odds: u32) -> Multiplier {
        Multiplier::whole(1 + odds as u64).less_edge(self.house_edge_bps)
    }

    fn runner(&self, horse: usize) -> Option<&Runner> {
        horse.checked_sub(1).and_then(|i| self.field.get(i))
    }
}

impl GameStrategy for HorseRacingGame {
    fn game_type(&self) -> GameType {
        GameType::HorseRacing
    }

    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError> {
        let GameParams::HorseRacing { horse } = params else {
            return Err(mismatch(GameType::HorseRacing, params));
        };
        if self.runner(*horse).is_none() {
            return Err(ValidationError::InvalidBet(format!(
                "horse must be 1-{}, got {}",
                self.field.len(),
                horse
            )));
        }
        Ok(())
    }

    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError> {
        self.validate_bet_shape(params)?;
        let GameParams::HorseRacing { horse } = *params else {
            return Err(mismatch(GameType::HorseRacing, params));
        };

        let winner = rng
            .weighted(&self.weights)
            .map(|i| i + 1)
            .ok_or_else(|| ValidationError::InvalidBet("race field is empty".to_string()))?;
        let (winner_name, odds) = match self.runner(winner) {
            Some(runner) => (runner.name.clone(), runner.odds),
            None => return Err(ValidationError::InvalidBet("race field is empty".to_string())),
        };

        let multiplier = if winner == horse {
            self.multiplier(odds)
        } else {
            Multiplier::ZERO
        };

        Ok(Draw {
            outcome_key: format!("horse_racing:{}", winner),
            multiplier,
            detail: GameDetail::HorseRacing {
                horse,
                winner,
                winner_name,
                odds,
            },
        })
    }
}
