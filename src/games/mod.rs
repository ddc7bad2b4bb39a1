//! Payout calculation for the six venue games
//!
//! Each game is a [`GameStrategy`]: a bet-shape check plus a pure outcome
//! function over a [`GameRng`]. The [`PayoutCalculator`] routes by game type so
//! that settlement never needs to know which game produced a draw.

pub mod blackjack;
pub mod dice;
pub mod horse_racing;
pub mod rng;
pub mod roulette;
pub mod slots;
pub mod types;
pub mod video_poker;

pub use rng::GameRng;
pub use types::{Draw, GameDetail, GameParams, GameType, Multiplier, VenueKey};

use crate::config::CasinoConfig;
use crate::errors::{CasinoResult, ValidationError};
use std::collections::HashMap;

/// Per-game rules consumed by the settlement engine
pub trait GameStrategy: Send + Sync {
    fn game_type(&self) -> GameType;

    /// Reject malformed bets before any balance moves
    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError>;

    /// Draw an outcome; deterministic for a given RNG stream
    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError>;
}

/// Shared helper for strategies receiving another game's parameters
pub(crate) fn mismatch(expected: GameType, params: &GameParams) -> ValidationError {
    ValidationError::GameMismatch {
        expected,
        actual: params.game_type(),
    }
}

/// Routes bets to the strategy for their venue's game
pub struct PayoutCalculator {
    strategies: HashMap<GameType, Box<dyn GameStrategy>>,
}

impl PayoutCalculator {
    pub fn new(config: &CasinoConfig) -> Self {
        let mut strategies: HashMap<GameType, Box<dyn GameStrategy>> = HashMap::new();
        strategies.insert(
            GameType::Dice,
            Box::new(dice::DiceGame::new(config.dice.house_edge_bps)),
        );
        strategies.insert(GameType::Roulette, Box::new(roulette::RouletteGame));
        strategies.insert(GameType::Blackjack, Box::new(blackjack::BlackjackGame));
        strategies.insert(
            GameType::HorseRacing,
            Box::new(horse_racing::HorseRacingGame::new(
                config.horse_racing.field.clone(),
                config.horse_racing.house_edge_bps,
            )),
        );
        strategies.insert(GameType::VideoPoker, Box::new(video_poker::VideoPokerGame));
        strategies.insert(GameType::Slots, Box::new(slots::SlotsGame::standard()));

        Self { strategies }
    }

    /// Replace one game's strategy
    pub fn with_strategy(mut self, strategy: Box<dyn GameStrategy>) -> Self {
        self.strategies.insert(strategy.game_type(), strategy);
        self
    }

    fn strategy(&self, game_type: GameType) -> Result<&dyn GameStrategy, ValidationError> {
        self.strategies
            .get(&game_type)
            .map(|s| s.as_ref())
            .ok_or_else(|| ValidationError::UnknownGame(game_type.to_string()))
    }

    pub fn validate_bet_shape(&self, game_type: GameType, params: &GameParams) -> CasinoResult<()> {
        if params.game_type() != game_type {
            return Err(mismatch(game_type, params).into());
        }
        Ok(self.strategy(game_type)?.validate_bet_shape(params)?)
    }

    pub fn compute(
        &self,
        game_type: GameType,
        params: &GameParams,
        rng: &mut GameRng,
    ) -> CasinoResult<Draw> {
        self.validate_bet_shape(game_type, params)?;
        Ok(self.strategy(game_type)?.compute_outcome(params, rng)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::roulette::RouletteBet;

    #[test]
    fn test_calculator_rejects_params_for_other_game() {
        let calculator = PayoutCalculator::new(&CasinoConfig::default());
        let err = calculator
            .validate_bet_shape(GameType::Dice, &GameParams::Slots)
            .unwrap_err();
        assert!(err.to_string().contains("venue runs dice"));
    }

    #[test]
    fn test_calculator_is_deterministic_for_seed() {
        let calculator = PayoutCalculator::new(&CasinoConfig::default());
        let params = GameParams::Roulette {
            bet: RouletteBet::Red,
        };
        let a = calculator
            .compute(GameType::Roulette, &params, &mut GameRng::seeded(99))
            .unwrap();
        let b = calculator
            .compute(GameType::Roulette, &params, &mut GameRng::seeded(99))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_game_has_a_strategy() {
        let calculator = PayoutCalculator::new(&CasinoConfig::default());
        for game in GameType::ALL {
            assert!(calculator.strategy(game).is_ok());
        }
    }
}
