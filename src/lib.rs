//! Venue Casino
//!
//! Player-owned casino venues. Players buy tables and machines from the house,
//! bank the wagers placed there, and forfeit them when they cannot cover a
//! win. A forfeited venue can be bought back with points for a short window.
//! Slot machines change hands by lottery at the end of each ownership term.

pub mod api;
pub mod common;
pub mod config;
pub mod engine;
pub mod errors;
pub mod games;
pub mod lottery;
pub mod metrics;
pub mod notify;
pub mod settlement;
pub mod storage;
pub mod venues;

pub use common::types::{
    BuyBackOffer, BuyBackResolution, Currency, PlayerIdentity, Venue, WagerOutcome, WagerState,
};
pub use config::{CasinoConfig, ConfigBuilder, ConfigLoader, ShortfallPolicy};
pub use engine::{CasinoService, CasinoServiceBuilder};
pub use errors::{CasinoError, CasinoResult};
pub use games::{GameParams, GameType, VenueKey};
