//! Shared record types and the injected clock

pub mod clock;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
