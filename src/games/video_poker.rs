//! Jacks-or-better video poker
//!
//! Five cards are dealt, the hold strategy picks which to keep, discards are
//! replaced from the same deck and the final hand is scored on the paytable.

use super::{mismatch, Draw, GameDetail, GameParams, GameRng, GameStrategy, GameType, Multiplier};
use crate::errors::ValidationError;
use serde::{Deserialize, Serialize};

/// Which dealt cards to keep before the draw
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HoldStrategy {
    /// Keep made hands of straight or better, else any paired ranks, else high cards
    #[default]
    Auto,
    /// Keep all five
    StandPat,
    Mask([bool; 5]),
}

/// Poker hand rankings, lowest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PokerHand {
    HighCard,
    JacksOrBetter,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

impl PokerHand {
    /// Gross paytable multiplier
    pub fn multiplier(&self) -> Multiplier {
        let times = match self {
            PokerHand::HighCard => 0,
            PokerHand::JacksOrBetter => 1,
            PokerHand::TwoPair => 2,
            PokerHand::ThreeOfAKind => 3,
            PokerHand::Straight => 4,
            PokerHand::Flush => 6,
            PokerHand::FullHouse => 9,
            PokerHand::FourOfAKind => 25,
            PokerHand::StraightFlush => 50,
            PokerHand::RoyalFlush => 800,
        };
        Multiplier::whole(times)
    }

    fn as_str(&self) -> &'static str {
        match self {
            PokerHand::HighCard => "high_card",
            PokerHand::JacksOrBetter => "jacks_or_better",
            PokerHand::TwoPair => "two_pair",
            PokerHand::ThreeOfAKind => "three_of_a_kind",
            PokerHand::Straight => "straight",
            PokerHand::Flush => "flush",
            PokerHand::FullHouse => "full_house",
            PokerHand::FourOfAKind => "four_of_a_kind",
            PokerHand::StraightFlush => "straight_flush",
            PokerHand::RoyalFlush => "royal_flush",
        }
    }
}

/// Rank 1-13, ace = 1
fn card_rank(card: u8) -> u8 {
    (card % 13) + 1
}

fn card_suit(card: u8) -> u8 {
    card / 13
}

fn rank_counts(cards: &[u8; 5]) -> [u8; 14] {
    let mut counts = [0u8; 14];
    for &card in cards {
        counts[card_rank(card) as usize] += 1;
    }
    counts
}

pub fn evaluate_hand(cards: &[u8; 5]) -> PokerHand {
    let mut ranks = cards.map(card_rank);
    ranks.sort_unstable();

    let is_flush = cards.iter().all(|&c| card_suit(c) == card_suit(cards[0]));
    let has_duplicates = ranks.windows(2).any(|w| w[0] == w[1]);
    let is_royal = ranks == [1, 10, 11, 12, 13];
    let is_straight = !has_duplicates && (is_royal || ranks[4] - ranks[0] == 4);

    let counts = rank_counts(cards);
    let mut pairs = 0u8;
    let mut high_pair = false;
    let mut three_kind = false;
    let mut four_kind = false;
    for (rank, &count) in counts.iter().enumerate() {
        match count {
            2 => {
                pairs += 1;
                high_pair |= rank >= 11 || rank == 1;
            }
            3 => three_kind = true,
            4 => four_kind = true,
            _ => {}
        }
    }

    if is_royal && is_flush {
        PokerHand::RoyalFlush
    } else if is_straight && is_flush {
        PokerHand::StraightFlush
    } else if four_kind {
        PokerHand::FourOfAKind
    } else if three_kind && pairs == 1 {
        PokerHand::FullHouse
    } else if is_flush {
        PokerHand::Flush
    } else if is_straight {
        PokerHand::Straight
    } else if three_kind {
        PokerHand::ThreeOfAKind
    } else if pairs == 2 {
        PokerHand::TwoPair
    } else if pairs == 1 && high_pair {
        PokerHand::JacksOrBetter
    } else {
        PokerHand::HighCard
    }
}

fn auto_hold(cards: &[u8; 5]) -> [bool; 5] {
    if evaluate_hand(cards) >= PokerHand::Straight {
        return [true; 5];
    }
    let counts = rank_counts(cards);
    let paired = cards.map(|c| counts[card_rank(c) as usize] >= 2);
    if paired.iter().any(|&h| h) {
        return paired;
    }
    cards.map(|c| {
        let rank = card_rank(c);
        rank == 1 || rank >= 11
    })
}

impl HoldStrategy {
    pub fn holds(&self, dealt: &[u8; 5]) -> [bool; 5] {
        match self {
            HoldStrategy::Auto => auto_hold(dealt),
            HoldStrategy::StandPat => [true; 5],
            HoldStrategy::Mask(mask) => *mask,
        }
    }
}

/// Deal from the end of `deck`, replace unheld cards, return the final hand
pub fn play_hand(mut deck: Vec<u8>, hold: HoldStrategy) -> Result<[u8; 5], ValidationError> {
    let mut deal = || {
        deck.pop()
            .ok_or_else(|| ValidationError::InvalidBet("deck exhausted".to_string()))
    };
    let mut hand = [0u8; 5];
    for card in hand.iter_mut() {
        *card = deal()?;
    }
    let held = hold.holds(&hand);
    for (card, keep) in hand.iter_mut().zip(held) {
        if !keep {
            *card = deal()?;
        }
    }
    Ok(hand)
}

pub struct VideoPokerGame;

impl GameStrategy for VideoPokerGame {
    fn game_type(&self) -> GameType {
        GameType::VideoPoker
    }

    fn validate_bet_shape(&self, params: &GameParams) -> Result<(), ValidationError> {
        match params {
            GameParams::VideoPoker { .. } => Ok(()),
            _ => Err(mismatch(GameType::VideoPoker, params)),
        }
    }

    fn compute_outcome(&self, params: &GameParams, rng: &mut GameRng) -> Result<Draw, ValidationError> {
        let GameParams::VideoPoker { hold } = *params else {
            return Err(mismatch(GameType::VideoPoker, params));
        };

        let cards = play_hand(rng.shuffled_deck(), hold)?;
        let hand = evaluate_hand(&cards);

        Ok(Draw {
            outcome_key: format!("video_poker:{}", hand.as_str()),
            multiplier: hand.multiplier(),
            detail: GameDetail::VideoPoker { cards, hand },
        })
    }
}
