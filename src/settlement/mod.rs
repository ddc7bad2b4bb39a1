//! Wager settlement and the buy-back offers it can produce

pub mod buyback;
pub mod resolver;

pub use buyback::BuyBackDesk;
pub use resolver::SettlementResolver;
