//! Request Handlers
//!
//! Thin adapters from HTTP onto [`CasinoService`]. Identity comes from the
//! [`Player`] extractor; every domain error maps to one status code.

use super::{
    errors::ApiError,
    middleware::{Player, RequestId},
    models::*,
};
use crate::common::types::{
    BuyBackResolution, ClaimResponse, LotteryEntry, PlaceWager, RespondBuyBack, Venue,
    VenueStatus, WagerOutcome,
};
use crate::engine::CasinoService;
use crate::games::types::{GameType, VenueKey};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub casino: Arc<CasinoService>,
    pub version: String,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn venue_key(request_id: &RequestId, game: &str, location: String) -> Result<VenueKey, ApiError> {
    let game_type: GameType = game
        .parse()
        .map_err(|e: crate::errors::ValidationError| ApiError::casino(request_id.0.clone(), e.into()))?;
    Ok(VenueKey::new(game_type, location))
}

/// Body extraction that reports malformed JSON through the API error shape
fn body<T>(request_id: &RequestId, body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(t)| t)
        .map_err(|e| ApiError::bad_request(request_id.0.clone(), e.body_text()))
}

fn casino_err(request_id: &RequestId) -> impl Fn(crate::errors::CasinoError) -> ApiError + '_ {
    move |e| ApiError::casino(request_id.0.clone(), e)
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        version: state.version.clone(),
        cache: state.casino.cache_stats(),
    })
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.casino.metrics().to_prometheus_format(),
    )
}

/// GET /venues/:game/:location
pub async fn venue_handler(
    request_id: RequestId,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
) -> ApiResult<VenueStatus> {
    let key = venue_key(&request_id, &game, location)?;
    let status = state
        .casino
        .venue_status(&key)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(status))
}

/// POST /venues/:game/:location/wager
pub async fn wager_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
    request: Result<Json<WagerRequest>, JsonRejection>,
) -> ApiResult<WagerOutcome> {
    let key = venue_key(&request_id, &game, location)?;
    let request = body(&request_id, request)?;
    let outcome = state
        .casino
        .place_wager(
            &player,
            PlaceWager {
                venue: key,
                stake: request.stake,
                params: request.params,
            },
        )
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(outcome))
}

/// POST /venues/:game/:location/claim
pub async fn claim_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
) -> ApiResult<ClaimResponse> {
    let key = venue_key(&request_id, &game, location)?;
    let claimed = state
        .casino
        .claim_venue(&player, &key)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(claimed))
}

/// POST /venues/:game/:location/relinquish
pub async fn relinquish_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
) -> ApiResult<Venue> {
    let key = venue_key(&request_id, &game, location)?;
    let venue = state
        .casino
        .relinquish_venue(&player, &key)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(venue))
}

/// POST /venues/:game/:location/transfer
pub async fn transfer_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
    request: Result<Json<TransferRequest>, JsonRejection>,
) -> ApiResult<Venue> {
    let key = venue_key(&request_id, &game, location)?;
    let request = body(&request_id, request)?;
    let venue = state
        .casino
        .transfer_venue(&player, &key, &request.to)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(venue))
}

/// POST /venues/:game/:location/max-bet
pub async fn max_bet_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
    request: Result<Json<MaxBetRequest>, JsonRejection>,
) -> ApiResult<Venue> {
    let key = venue_key(&request_id, &game, location)?;
    let request = body(&request_id, request)?;
    let venue = state
        .casino
        .set_max_bet(&player, &key, request.max_bet)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(venue))
}

/// POST /venues/:game/:location/buy-back-reward
pub async fn buy_back_reward_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
    request: Result<Json<BuyBackRewardRequest>, JsonRejection>,
) -> ApiResult<Venue> {
    let key = venue_key(&request_id, &game, location)?;
    let request = body(&request_id, request)?;
    let venue = state
        .casino
        .set_buy_back_reward(&player, &key, request.amount)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(venue))
}

/// POST /venues/:game/:location/lottery
pub async fn lottery_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path((game, location)): Path<(String, String)>,
) -> ApiResult<LotteryEntry> {
    let key = venue_key(&request_id, &game, location)?;
    let entry = state
        .casino
        .enter_lottery(&player, &key)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(entry))
}

/// POST /offers/:id/respond
pub async fn respond_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path(offer_id): Path<String>,
    request: Result<Json<RespondRequest>, JsonRejection>,
) -> ApiResult<BuyBackResolution> {
    let request = body(&request_id, request)?;
    let resolution = state
        .casino
        .respond_buy_back(
            &player,
            RespondBuyBack {
                offer_id,
                decision: request.decision,
            },
        )
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(resolution))
}

/// GET /offers/pending
pub async fn pending_offers_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
) -> ApiResult<PendingOffersResponse> {
    let offers = state
        .casino
        .pending_offers(&player)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(PendingOffersResponse { offers }))
}

/// GET /players/me/venues
pub async fn owned_venues_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
) -> ApiResult<OwnedVenuesResponse> {
    let venues = state
        .casino
        .owned_venues(&player)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(OwnedVenuesResponse { venues }))
}

/// GET /history/:game
pub async fn history_handler(
    request_id: RequestId,
    Player(player): Player,
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
) -> ApiResult<HistoryResponse> {
    let game_type: GameType = game
        .parse()
        .map_err(|e: crate::errors::ValidationError| ApiError::casino(request_id.0.clone(), e.into()))?;
    let entries = state
        .casino
        .recent_history(&player, game_type)
        .await
        .map_err(casino_err(&request_id))?;
    Ok(Json(HistoryResponse { game_type, entries }))
}
