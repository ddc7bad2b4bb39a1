//! API Request and Response Models
//!
//! Bodies for the venue endpoints. Domain records are serialized as-is.

use crate::common::types::{BuyBackDecision, BuyBackOffer, HistoryEntry, OwnedVenue};
use crate::games::types::{GameParams, GameType};
use crate::venues::CacheStats;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cache: CacheStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WagerRequest {
    pub stake: i64,
    pub params: GameParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxBetRequest {
    pub max_bet: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyBackRewardRequest {
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RespondRequest {
    pub decision: BuyBackDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOffersResponse {
    pub offers: Vec<BuyBackOffer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub game_type: GameType,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedVenuesResponse {
    pub venues: Vec<OwnedVenue>,
}
