//! Single-hand blackjack resolved in one request
//!
//! The player's decisions arrive up front as a list of actions; once the list
//! runs out the player stands. The dealer draws to 17 and stands on all 17s.

use super::{mismatch, Draw, GameDetail, GameParams, GameRng, GameStrategy, GameType, Multiplier};
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Hitting more than this many times always busts
const MAX_ACTIONS: usize = 11;
const DEALER_STANDS_ON: u8 = 17;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackAction {
    Hit,
    Stand,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackResult {
    Blackjack,
    Win,
    DealerBust,
    Push,
    Lose,
    PlayerBust,
    DealerBlackjack,
}

impl BlackjackResult {
    pub fn multiplier(&self) -> Multiplier {
        match self {
            BlackjackResult::Blackjack => Multiplier::from_bps(25_000),
            BlackjackResult::Win | BlackjackResult::DealerBust => Multiplier::whole(2),
            BlackjackResult::Push => Multiplier::whole(1),
            BlackjackResult::Lose | BlackjackResult::PlayerBust | BlackjackResult::DealerBlackjack => {
                Multiplier::ZERO
            }
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            BlackjackResult::Blackjack => "blackjack",
            BlackjackResult::Win => "win",
            BlackjackResult::DealerBust => "dealer_bust",
            BlackjackResult::Push => "push",
            BlackjackResult::Lose => "lose",
            BlackjackResult::PlayerBust => "player_bust",
            BlackjackResult::DealerBlackjack => "dealer_blackjack",
        }
    }
}

/// Best total for a hand and whether an ace still counts as 11
pub fn hand_value(cards: &[u8]) -> (u8, bool) {
    let mut value: u16 = 0;
    let mut aces: u8 = 0;

    for &card in cards {
        let rank = (card % 13) + 1;
        if rank == 1 {
            aces += 1;
            value += 11;
        } else if rank >= 10 {
            value += 10;
        } else {
            value += rank as u16;
        }
    }

    while value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }

    (value.min(255) as u8, aces > 0 && value <= 21)
}

pub fn is_blackjack(cards: &[u8]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == 21
}

struct Shoe {
    cards: Vec<u8>,
}

impl Shoe {
    fn deal(&mut self) -> Result<u8, ValidationError> {
        self.cards
            .pop()
            .ok_or_else(|| ValidationError::InvalidBet("shoe exhausted".to_string()))
    }
}

/// Play out one hand from a shuffled deck
pub fn play_hand(
    deck: Vec<u8>,
    actions: &[BlackjackAction],
) -> Result<(Vec<u8>, Vec<u8>, BlackjackResult), ValidationError> {
    let mut shoe = Shoe { cards: deck };
    let mut player = vec![shoe.deal()?];
    let mut dealer = vec![shoe.deal()?];
    player.push(shoe.deal()?);
    dealer.push(shoe.deal()?);

    match (is_blackjack(&player), is_blackjack(&dealer)) {
        (true, true) => return Ok((player, dealer, BlackjackResult::Push)),
        (true, false) => return Ok((player, dealer, BlackjackResult::Blackjack)),
        (false, true) => return Ok((player, dealer, BlackjackResult::DealerBlackjack)),
        (false, false) => {}
    }

    for action in actions {
        match action {
            BlackjackAction::Stand => break,
            BlackjackAction::Hit => {
                player.push(shoe.deal()?);
                let (total, _) = hand_value(&player);
                if total > 21 {
                    return Ok((player, dealer, BlackjackResult::PlayerBust));
                }
                if total == 21 {
                    break;
                }
            }
        }
    }

    while hand_value(&dealer).0 < DEALER_STANDS_ON {
        dealer.push(shoe.deal()?);
    }

    let (player_total, _) = hand_value(&player);
    let (dealer_total, _) = hand_value(&dealer);
    let result = if dealer_total > 21 {
        BlackjackResult::DealerBust
    } else if player_total > dealer_total {
        BlackjackResult::Win
    } else if player_total == dealer_total {
        BlackjackResult::Push
    } else {
        BlackjackResult::Lose
    };

    Ok((player, dealer, result))
}

pub struct BlackjackGame;

impl GameStrategy for BlackjackGame {
    fn game_type(&self) -> GameType {
        GameType::Blackjack
    }

    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError> {
        let GameParams::Blackjack { actions } = params else {
            return Err(mismatch(GameType::Blackjack, params));
        };
        if actions.len() > MAX_ACTIONS {
            return Err(ValidationError::InvalidBet(format!(
                "at most {} actions per hand",
                MAX_ACTIONS
            )));
        }
        Ok(())
    }

    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError> {
        self.validate_bet_shape(params)?;
        let GameParams::Blackjack { actions } = params else {
            return Err(mismatch(GameType::Blackjack, params));
        };

        let (player_cards, dealer_cards, result) = play_hand(rng.shuffled_deck(), actions)?;
        let player_total = hand_value(&player_cards).0;
        let dealer_total = hand_value(&dealer_cards).0;

        Ok(Draw {
            outcome_key: format!(
                "blackjack:{}:{}-{}",
                result.as_str(),
                player_total,
                dealer_total
            ),
            multiplier: result.multiplier(),
            detail: GameDetail::Blackjack {
                player_cards,
                dealer_cards,
                player_total,
                dealer_total,
                result,
            },
        })
    }
}
