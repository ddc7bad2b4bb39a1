//! Venue ownership registry, its read-through cache and wager validation

pub mod cache;
pub mod registry;
pub mod validator;

pub use cache::{CacheStats, VenueCache};
pub use registry::{validate_location, VenueRegistry};
pub use validator::{check_stake, WagerValidator};
