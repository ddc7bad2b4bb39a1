//! Player balances
//!
//! Balances belong to the surrounding game; the engine only reaches them
//! through [`BalanceProvider`]. Debits are conditional so concurrent
//! settlements can never drive a balance negative.

use crate::common::types::{Currency, PlayerId};
use crate::errors::{CasinoResult, FundsError, ValidationError};
use async_trait::async_trait;
use dashmap::DashMap;

#[async_trait]
pub trait BalanceProvider: Send + Sync {
    async fn balance(&self, player: &str, currency: Currency) -> CasinoResult<i64>;

    /// Returns the new balance
    async fn credit(&self, player: &str, currency: Currency, amount: i64) -> CasinoResult<i64>;

    /// Atomic check-and-debit; fails with `InsufficientFunds` instead of going negative
    async fn debit(&self, player: &str, currency: Currency, amount: i64) -> CasinoResult<i64>;
}

/// In-process balances, seeded lazily with an opening amount per currency
#[derive(Debug, Default)]
pub struct MemoryBalances {
    balances: DashMap<(PlayerId, Currency), i64>,
    opening_cash: i64,
    opening_points: i64,
}

impl MemoryBalances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_opening(opening_cash: i64, opening_points: i64) -> Self {
        Self {
            balances: DashMap::new(),
            opening_cash,
            opening_points,
        }
    }

    pub fn set(&self, player: &str, currency: Currency, amount: i64) {
        self.balances.insert((player.to_string(), currency), amount);
    }

    fn opening(&self, currency: Currency) -> i64 {
        match currency {
            Currency::Cash => self.opening_cash,
            Currency::Points => self.opening_points,
        }
    }
}

fn check_amount(amount: i64) -> CasinoResult<()> {
    if amount < 0 {
        return Err(ValidationError::InvalidAmount(amount).into());
    }
    Ok(())
}

#[async_trait]
impl BalanceProvider for MemoryBalances {
    async fn balance(&self, player: &str, currency: Currency) -> CasinoResult<i64> {
        Ok(self
            .balances
            .get(&(player.to_string(), currency))
            .map(|b| *b)
            .unwrap_or_else(|| self.opening(currency)))
    }

    async fn credit(&self, player: &str, currency: Currency, amount: i64) -> CasinoResult<i64> {
        check_amount(amount)?;
        let opening = self.opening(currency);
        let mut balance = self
            .balances
            .entry((player.to_string(), currency))
            .or_insert(opening);
        *balance = balance.saturating_add(amount);
        Ok(*balance)
    }

    async fn debit(&self, player: &str, currency: Currency, amount: i64) -> CasinoResult<i64> {
        check_amount(amount)?;
        let opening = self.opening(currency);
        let mut balance = self
            .balances
            .entry((player.to_string(), currency))
            .or_insert(opening);
        if *balance < amount {
            return Err(FundsError::InsufficientFunds {
                currency,
                required: amount,
                available: *balance,
            }
            .into());
        }
        *balance -= amount;
        Ok(*balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CasinoError;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_opening_balance_applies_to_unknown_players() {
        let balances = MemoryBalances::with_opening(1_000, 5);
        assert_eq!(balances.balance("new", Currency::Cash).await.unwrap(), 1_000);
        assert_eq!(balances.balance("new", Currency::Points).await.unwrap(), 5);
        assert_eq!(balances.credit("new", Currency::Cash, 1).await.unwrap(), 1_001);
    }

    #[tokio::test]
    async fn test_debit_never_goes_negative() {
        let balances = MemoryBalances::new();
        balances.set("bob", Currency::Cash, 400);
        let err = balances.debit("bob", Currency::Cash, 401).await.unwrap_err();
        assert!(matches!(
            err,
            CasinoError::Funds(FundsError::InsufficientFunds { available: 400, .. })
        ));
        assert_eq!(balances.debit("bob", Currency::Cash, 400).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected() {
        let balances = MemoryBalances::new();
        assert!(balances.credit("bob", Currency::Cash, -5).await.is_err());
        assert!(balances.debit("bob", Currency::Cash, -5).await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_debits_respect_balance() {
        let balances = Arc::new(MemoryBalances::new());
        balances.set("bob", Currency::Cash, 1_000);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let balances = balances.clone();
            handles.push(tokio::spawn(async move {
                balances.debit("bob", Currency::Cash, 100).await.is_ok()
            }));
        }
        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 10);
        assert_eq!(balances.balance("bob", Currency::Cash).await.unwrap(), 0);
    }
}
