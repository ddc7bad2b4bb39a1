//! Dice: call the face of an N-sided die.
//!
//! Pays `sides x (1 - house_edge)` when the roll matches the guess.

use super::{mismatch, Draw, GameDetail, GameParams, GameRng, GameStrategy, GameType, Multiplier};
use crate::errors::ValidationError;

pub const MIN_SIDES: u32 = 2;
pub const MAX_SIDES: u32 = 100;

pub struct DiceGame {
    house_edge_bps: u32,
}

impl DiceGame {
    pub fn new(house_edge_bps: u32) -> Self {
        Self { house_edge_bps }
    }

    pub fn multiplier(&self, sides: u32) -> Multiplier {
        Multiplier::whole(sides as u64).less_edge(self.house_edge_bps)
    }
}

impl GameStrategy for DiceGame {
    fn game_type(&self) -> GameType {
        GameType::Dice
    }

    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError> {
        let GameParams::Dice { sides, guess } = params else {
            return Err(mismatch(GameType::Dice, params));
        };
        if !(MIN_SIDES..=MAX_SIDES).contains(sides) {
            return Err(ValidationError::InvalidBet(format!(
                "die must have {}..={} sides, got {}",
                MIN_SIDES, MAX_SIDES, sides
            )));
        }
        if *guess == 0 || guess > sides {
            return Err(ValidationError::InvalidBet(format!(
                "guess {} is not a face of a {}-sided die",
                guess, sides
            )));
        }
        Ok(())
    }

    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError> {
        self.validate_bet_shape(params)?;
        let GameParams::Dice { sides, guess } = *params else {
            return Err(mismatch(GameType::Dice, params));
        };

        let roll = rng.roll(sides);
        let multiplier = if roll == guess {
            self.multiplier(sides)
        } else {
            Multiplier::ZERO
        };

        Ok(Draw {
            outcome_key: format!("dice:d{}:{}", sides, roll),
            multiplier,
            detail: GameDetail::Dice { sides, guess, roll },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_includes_house_edge() {
        let game = DiceGame::new(500);
        assert_eq!(game.multiplier(6), Multiplier::from_bps(57_000));
        assert_eq!(game.multiplier(2), Multiplier::from_bps(19_000));
    }

    #[test]
    fn test_bet_shape() {
        let game = DiceGame::new(0);
        assert!(game
            .validate_bet_shape(&GameParams::Dice { sides: 6, guess: 6 })
            .is_ok());
        assert!(game
            .validate_bet_shape(&GameParams::Dice { sides: 1, guess: 1 })
            .is_err());
        assert!(game
            .validate_bet_shape(&GameParams::Dice { sides: 6, guess: 7 })
            .is_err());
        assert!(game
            .validate_bet_shape(&GameParams::Dice { sides: 6, guess: 0 })
            .is_err());
    }

    #[test]
    fn test_outcome_matches_roll() {
        let game = DiceGame::new(500);
        let mut rng = GameRng::seeded(11);
        for _ in 0..200 {
            let draw = game
                .compute_outcome(&GameParams::Dice { sides: 4, guess: 2 }, &mut rng)
                .unwrap();
            let GameDetail::Dice { roll, .. } = draw.detail else {
                panic!("expected dice detail");
            };
            assert!((1..=4).contains(&roll));
            assert_eq!(draw.multiplier.is_loss(), roll != 2);
        }
    }

    #[test]
    fn test_rolls_are_roughly_uniform() {
        let game = DiceGame::new(0);
        let mut rng = GameRng::seeded(5);
        let mut counts = [0u32; 6];
        for _ in 0..6_000 {
            let draw = game
                .compute_outcome(&GameParams::Dice { sides: 6, guess: 1 }, &mut rng)
                .unwrap();
            if let GameDetail::Dice { roll, .. } = draw.detail {
                counts[(roll - 1) as usize] += 1;
            }
        }
        assert!(counts.iter().all(|&c| (850..=1150).contains(&c)), "{:?}", counts);
    }
}
