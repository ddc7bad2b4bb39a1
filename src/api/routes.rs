//! Route Definitions
//!
//! Maps URLs to handlers.

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        // Venues
        .route("/venues/:game/:location", get(venue_handler))
        .route("/venues/:game/:location/wager", post(wager_handler))
        .route("/venues/:game/:location/claim", post(claim_handler))
        .route("/venues/:game/:location/relinquish", post(relinquish_handler))
        .route("/venues/:game/:location/transfer", post(transfer_handler))
        .route("/venues/:game/:location/max-bet", post(max_bet_handler))
        .route(
            "/venues/:game/:location/buy-back-reward",
            post(buy_back_reward_handler),
        )
        .route("/venues/:game/:location/lottery", post(lottery_handler))
        // Buy-back offers
        .route("/offers/pending", get(pending_offers_handler))
        .route("/offers/:id/respond", post(respond_handler))
        // Player views
        .route("/players/me/venues", get(owned_venues_handler))
        .route("/history/:game", get(history_handler))
        .with_state(state)
}
