//! HTTP API
//!
//! JSON endpoints over the casino service. Callers are identified by headers
//! set by an upstream identity provider.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{build_app, ApiServer};
