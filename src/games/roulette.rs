//! Single-zero roulette
//!
//! Zero loses every bet except a straight bet on zero.

use super::{mismatch, Draw, GameDetail, GameParams, GameRng, GameStrategy, GameType, Multiplier};
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};

const POCKETS: u32 = 37;

const RED_NUMBERS: [u8; 18] = [
    1, 3, 5, 7, 9, 12, 14, 16, 18, 19, 21, 23, 25, 27, 30, 32, 34, 36,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouletteBet {
    Straight { number: u8 },
    Dozen { dozen: u8 },
    Column { column: u8 },
    Red,
    Black,
    Even,
    Odd,
    Low,
    High,
}

impl RouletteBet {
    /// Gross multiplier on a win
    pub fn multiplier(&self) -> Multiplier {
        match self {
            RouletteBet::Straight { .. } => Multiplier::whole(36),
            RouletteBet::Dozen { .. } | RouletteBet::Column { .. } => Multiplier::whole(3),
            _ => Multiplier::whole(2),
        }
    }

    pub fn wins(&self, pocket: u8) -> bool {
        if pocket == 0 {
            return matches!(self, RouletteBet::Straight { number: 0 });
        }

        match *self {
            RouletteBet::Straight { number } => number == pocket,
            RouletteBet::Dozen { dozen } => (pocket - 1) / 12 + 1 == dozen,
            RouletteBet::Column { column } => (pocket - 1) % 3 + 1 == column,
            RouletteBet::Red => is_red(pocket),
            RouletteBet::Black => !is_red(pocket),
            RouletteBet::Even => pocket % 2 == 0,
            RouletteBet::Odd => pocket % 2 == 1,
            RouletteBet::Low => pocket <= 18,
            RouletteBet::High => pocket >= 19,
        }
    }
}

fn is_red(number: u8) -> bool {
    RED_NUMBERS.contains(&number)
}

pub struct RouletteGame;

impl GameStrategy for RouletteGame {
    fn game_type(&self) -> GameType {
        GameType::Roulette
    }

    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError> {
        let GameParams::Roulette { bet } = params else {
            return Err(mismatch(GameType::Roulette, params));
        };
        match *bet {
            RouletteBet::Straight { number } if number > 36 => Err(ValidationError::InvalidBet(
                format!("no pocket {} on a single-zero wheel", number),
            )),
            RouletteBet::Dozen { dozen } if !(1..=3).contains(&dozen) => Err(
                ValidationError::InvalidBet(format!("dozen must be 1-3, got {}", dozen)),
            ),
            RouletteBet::Column { column } if !(1..=3).contains(&column) => Err(
                ValidationError::InvalidBet(format!("column must be 1-3, got {}", column)),
            ),
            _ => Ok(()),
        }
    }

    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError> {
        self.validate_bet_shape(params)?;
        let GameParams::Roulette { bet } = *params else {
            return Err(mismatch(GameType::Roulette, params));
        };

        let pocket = rng.below(POCKETS) as u8;
        let multiplier = if bet.wins(pocket) {
            bet.multiplier()
        } else {
            Multiplier::ZERO
        };

        Ok(Draw {
            outcome_key: format!("roulette:{}", pocket),
            multiplier,
            detail: GameDetail::Roulette { bet, pocket },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_only_pays_straight_zero() {
        assert!(RouletteBet::Straight { number: 0 }.wins(0));
        assert!(!RouletteBet::Red.wins(0));
        assert!(!RouletteBet::Black.wins(0));
        assert!(!RouletteBet::Even.wins(0));
        assert!(!RouletteBet::Dozen { dozen: 1 }.wins(0));
    }

    #[test]
    fn test_outside_bets() {
        assert!(RouletteBet::Red.wins(1));
        assert!(RouletteBet::Black.wins(2));
        assert!(RouletteBet::Low.wins(18));
        assert!(RouletteBet::High.wins(19));
        assert!(RouletteBet::Odd.wins(35));
        assert!(RouletteBet::Even.wins(36));
    }

    #[test]
    fn test_dozens_and_columns() {
        assert!(RouletteBet::Dozen { dozen: 1 }.wins(12));
        assert!(RouletteBet::Dozen { dozen: 2 }.wins(13));
        assert!(RouletteBet::Dozen { dozen: 3 }.wins(36));
        assert!(RouletteBet::Column { column: 1 }.wins(34));
        assert!(RouletteBet::Column { column: 2 }.wins(35));
        assert!(RouletteBet::Column { column: 3 }.wins(36));
    }

    #[test]
    fn test_multiplier_table() {
        assert_eq!(RouletteBet::Straight { number: 7 }.multiplier(), Multiplier::whole(36));
        assert_eq!(RouletteBet::Column { column: 2 }.multiplier(), Multiplier::whole(3));
        assert_eq!(RouletteBet::High.multiplier(), Multiplier::whole(2));
    }

    #[test]
    fn test_rejects_out_of_range_bets() {
        let game = RouletteGame;
        for bet in [
            RouletteBet::Straight { number: 37 },
            RouletteBet::Dozen { dozen: 0 },
            RouletteBet::Column { column: 4 },
        ] {
            assert!(game.validate_bet_shape(&GameParams::Roulette { bet }).is_err());
        }
    }

    #[test]
    fn test_spin_lands_on_wheel() {
        let game = RouletteGame;
        let mut rng = GameRng::seeded(21);
        let params = GameParams::Roulette {
            bet: RouletteBet::Straight { number: 17 },
        };
        for _ in 0..500 {
            let draw = game.compute_outcome(&params, &mut rng).unwrap();
            let GameDetail::Roulette { pocket, .. } = draw.detail else {
                panic!("expected roulette detail");
            };
            assert!(pocket <= 36);
            assert_eq!(draw.multiplier.is_loss(), pocket != 17);
        }
    }
}
