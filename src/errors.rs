//! Error types for venue ownership and wager settlement
//!
//! Validation, ownership and funds errors are always raised before any balance
//! is touched. Storage and configuration errors propagate generically.

use crate::common::types::Currency;
use crate::games::types::{GameType, VenueKey};
use thiserror::Error;

/// Root error type for all casino operations
#[derive(Debug, Error)]
pub enum CasinoError {
    /// Bad stake, bad bet shape, self-play
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Not owner, already owned, category cap exceeded
    #[error("Ownership error: {0}")]
    Ownership(#[from] OwnershipError),

    /// Insufficient cash for a stake or claim, insufficient points for a buy-back
    #[error("Funds error: {0}")]
    Funds(#[from] FundsError),

    /// Unknown, already resolved or lazily expired buy-back offer
    #[error("Buy-back offer not found: {0}")]
    OfferNotFound(String),

    /// A balance kept moving under a conditional update; the request was rolled back
    #[error("Contention: {0}")]
    Contention(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Request shape errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Stake {stake} must be positive and at most {max_bet}")]
    InvalidStake { stake: i64, max_bet: i64 },

    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    #[error("Owners cannot play at their own venue")]
    SelfPlay,

    #[error("Bet is for {actual} but venue runs {expected}")]
    GameMismatch { expected: GameType, actual: GameType },

    #[error("Unknown game type: {0}")]
    UnknownGame(String),

    #[error("Invalid venue location: '{0}'")]
    InvalidLocation(String),

    #[error("Amount must not be negative: {0}")]
    InvalidAmount(i64),

    #[error("{0} is not a lottery venue")]
    NotLotteryVenue(VenueKey),
}

/// Ownership state errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("Player {player} does not own {venue}")]
    NotOwner { venue: VenueKey, player: String },

    #[error("{venue} is already owned by {owner}")]
    AlreadyOwned { venue: VenueKey, owner: String },

    #[error("Player {player} already owns {cap} {game_type} venue(s)")]
    CategoryCapExceeded {
        player: String,
        game_type: GameType,
        cap: usize,
    },

    #[error("Only the winner of the offer may respond to it")]
    NotResponder,

    #[error("Cannot transfer a venue to its current owner")]
    TransferToSelf,

    #[error("Ownership of {0} changed while the request was in flight")]
    OwnershipChanged(VenueKey),
}

/// Balance errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FundsError {
    #[error("Insufficient {currency}: required {required}, available {available}")]
    InsufficientFunds {
        currency: Currency,
        required: i64,
        available: i64,
    },
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Storage system errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database open failed: {0}")]
    DatabaseOpenFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

impl CasinoError {
    /// True when the error guarantees that no balance or record was mutated
    pub fn is_pre_mutation(&self) -> bool {
        matches!(
            self,
            CasinoError::Validation(_)
                | CasinoError::Ownership(_)
                | CasinoError::Funds(_)
                | CasinoError::OfferNotFound(_)
                | CasinoError::Contention(_)
        )
    }

    /// Stable machine-readable code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            CasinoError::Validation(_) => "VALIDATION_ERROR",
            CasinoError::Ownership(OwnershipError::NotOwner { .. })
            | CasinoError::Ownership(OwnershipError::NotResponder) => "FORBIDDEN",
            CasinoError::Ownership(_) => "OWNERSHIP_ERROR",
            CasinoError::Funds(_) => "INSUFFICIENT_FUNDS",
            CasinoError::OfferNotFound(_) => "NOT_FOUND",
            CasinoError::Contention(_) => "CONFLICT",
            CasinoError::Configuration(_) => "CONFIGURATION_ERROR",
            CasinoError::Storage(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<rocksdb::Error> for CasinoError {
    fn from(e: rocksdb::Error) -> Self {
        CasinoError::Storage(StorageError::WriteFailed(e.to_string()))
    }
}

impl From<serde_json::Error> for CasinoError {
    fn from(e: serde_json::Error) -> Self {
        CasinoError::Storage(StorageError::CorruptedData(e.to_string()))
    }
}

impl From<std::io::Error> for CasinoError {
    fn from(e: std::io::Error) -> Self {
        CasinoError::Storage(StorageError::ReadFailed(e.to_string()))
    }
}

impl From<toml::de::Error> for CasinoError {
    fn from(e: toml::de::Error) -> Self {
        CasinoError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

pub type CasinoResult<T> = Result<T, CasinoError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let err: CasinoError = ValidationError::InvalidStake {
            stake: 0,
            max_bet: 500,
        }
        .into();

        assert!(err.to_string().contains("Validation error"));
        assert!(err.to_string().contains("at most 500"));
    }

    #[test]
    fn test_funds_error_details() {
        let err = FundsError::InsufficientFunds {
            currency: Currency::Points,
            required: 5_000,
            available: 10,
        };

        assert!(err.to_string().contains("points"));
        assert!(err.to_string().contains("required 5000"));
    }

    #[test]
    fn test_pre_mutation_classification() {
        assert!(CasinoError::from(ValidationError::SelfPlay).is_pre_mutation());
        assert!(CasinoError::OfferNotFound("x".into()).is_pre_mutation());
        assert!(!CasinoError::from(StorageError::WriteFailed("disk".into())).is_pre_mutation());
    }

    #[test]
    fn test_error_source() {
        let err = CasinoError::from(ConfigurationError::ValidationFailed("test".to_string()));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_codes() {
        let not_owner = CasinoError::from(OwnershipError::NotResponder);
        assert_eq!(not_owner.code(), "FORBIDDEN");
        let cap = CasinoError::from(OwnershipError::TransferToSelf);
        assert_eq!(cap.code(), "OWNERSHIP_ERROR");
        let busy = CasinoError::Contention("owner balance".into());
        assert_eq!(busy.code(), "CONFLICT");
        assert!(busy.is_pre_mutation());
    }
}
