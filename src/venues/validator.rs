//! Pre-settlement wager checks. Nothing here mutates state.

use crate::common::types::{Currency, Venue};
use crate::errors::{CasinoResult, FundsError, ValidationError};
use crate::storage::BalanceProvider;
use std::sync::Arc;

/// Stake bounds, self-play and affordability against a known balance
pub fn check_stake(venue: &Venue, player: &str, stake: i64, balance: i64) -> CasinoResult<()> {
    if stake <= 0 || stake > venue.max_bet {
        return Err(ValidationError::InvalidStake {
            stake,
            max_bet: venue.max_bet,
        }
        .into());
    }
    if venue.is_owned_by(player) {
        return Err(ValidationError::SelfPlay.into());
    }
    if balance < stake {
        return Err(FundsError::InsufficientFunds {
            currency: Currency::Cash,
            required: stake,
            available: balance,
        }
        .into());
    }
    Ok(())
}

pub struct WagerValidator {
    balances: Arc<dyn BalanceProvider>,
}

impl WagerValidator {
    pub fn new(balances: Arc<dyn BalanceProvider>) -> Self {
        Self { balances }
    }

    pub async fn validate(&self, venue: &Venue, player: &str, stake: i64) -> CasinoResult<()> {
        let balance = self.balances.balance(player, Currency::Cash).await?;
        check_stake(venue, player, stake, balance)
    }
}
