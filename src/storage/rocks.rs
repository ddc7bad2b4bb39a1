//! RocksDB-backed store
//!
//! Records are JSON documents under typed key prefixes. RocksDB gives atomic
//! single-key writes; read-modify-write sequences are serialized through a
//! process-local write lock, and multi-key changes go through one `WriteBatch`.

use super::{finish_pool, CasinoStore, VenueGuard, VenuePatch};
use crate::common::types::{BuyBackOffer, HistoryEntry, LotteryPool, PlayerId, Venue};
use crate::errors::{CasinoResult, StorageError};
use crate::games::types::{GameType, VenueKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const VENUE_PREFIX: &str = "venue:";
const OFFER_PREFIX: &str = "offer:";
const OFFER_VENUE_PREFIX: &str = "offer-venue:";
const LOTTERY_PREFIX: &str = "lottery:";
const HISTORY_PREFIX: &str = "history:";

fn venue_key(key: &VenueKey) -> Vec<u8> {
    format!("{}{}", VENUE_PREFIX, key.storage_key()).into_bytes()
}

fn offer_key(id: &str) -> Vec<u8> {
    format!("{}{}", OFFER_PREFIX, id).into_bytes()
}

fn offer_venue_key(key: &VenueKey) -> Vec<u8> {
    format!("{}{}", OFFER_VENUE_PREFIX, key.storage_key()).into_bytes()
}

fn lottery_key(key: &VenueKey) -> Vec<u8> {
    format!("{}{}", LOTTERY_PREFIX, key.storage_key()).into_bytes()
}

fn history_key(player: &str, game_type: GameType) -> Vec<u8> {
    format!("{}{}:{}", HISTORY_PREFIX, game_type, player).into_bytes()
}

fn encode<T: Serialize>(value: &T) -> CasinoResult<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| StorageError::WriteFailed(format!("Failed to encode record: {}", e)).into())
}

#[derive(Clone)]
pub struct RocksStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksStore {
    pub fn open<P: AsRef<Path>>(path: P) -> CasinoResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref()).map_err(|e| {
            StorageError::DatabaseOpenFailed(format!("{}: {}", path.as_ref().display(), e))
        })?;
        debug!(path = %path.as_ref().display(), "opened casino store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn get<T: DeserializeOwned>(&self, key: &[u8]) -> CasinoResult<Option<T>> {
        let Some(bytes) = self
            .db
            .get(key)
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?
        else {
            return Ok(None);
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::CorruptedData(format!(
                "Failed to decode {}: {}",
                String::from_utf8_lossy(key),
                e
            ))
        })?;
        Ok(Some(value))
    }

    fn put<T: Serialize>(&self, key: &[u8], value: &T) -> CasinoResult<()> {
        self.db
            .put(key, encode(value)?)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }

    /// Decode every record whose key starts with `prefix`
    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> CasinoResult<Vec<T>> {
        let prefix = prefix.as_bytes();
        let mut out = Vec::new();
        for item in self.db.iterator(IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item.map_err(|e| StorageError::ReadFailed(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(&value)?);
        }
        Ok(out)
    }

    fn remove_offer(&self, offer: &BuyBackOffer) -> CasinoResult<()> {
        let mut batch = WriteBatch::default();
        batch.delete(offer_key(&offer.id));
        let index = offer_venue_key(&offer.venue);
        let indexed: Option<String> = self.get(&index)?;
        if indexed.as_deref() == Some(offer.id.as_str()) {
            batch.delete(index);
        }
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()).into())
    }
}

#[async_trait]
impl CasinoStore for RocksStore {
    async fn load_venue(&self, key: &VenueKey) -> CasinoResult<Option<Venue>> {
        self.get(&venue_key(key))
    }

    async fn insert_venue_if_absent(&self, venue: Venue) -> CasinoResult<Venue> {
        let _guard = self.write_lock.lock().await;
        let db_key = venue_key(&venue.key);
        if let Some(existing) = self.get(&db_key)? {
            return Ok(existing);
        }
        self.put(&db_key, &venue)?;
        Ok(venue)
    }

    async fn update_venue(
        &self,
        key: &VenueKey,
        guard: VenueGuard,
        patch: VenuePatch,
    ) -> CasinoResult<Option<Venue>> {
        let _guard = self.write_lock.lock().await;
        let db_key = venue_key(key);
        let Some(mut venue) = self.get::<Venue>(&db_key)? else {
            return Ok(None);
        };
        if !guard.admits(&venue) {
            return Ok(None);
        }
        patch.apply(&mut venue);
        self.put(&db_key, &venue)?;
        Ok(Some(venue))
    }

    async fn venues_owned_by(&self, player: &str, game_type: GameType) -> CasinoResult<Vec<Venue>> {
        let prefix = format!("{}{}:", VENUE_PREFIX, game_type);
        Ok(self
            .scan::<Venue>(&prefix)?
            .into_iter()
            .filter(|v| v.is_owned_by(player))
            .collect())
    }

    async fn insert_offer(&self, offer: BuyBackOffer, now: DateTime<Utc>) -> CasinoResult<bool> {
        let _guard = self.write_lock.lock().await;
        let index = offer_venue_key(&offer.venue);
        let mut batch = WriteBatch::default();

        if let Some(existing_id) = self.get::<String>(&index)? {
            if let Some(existing) = self.get::<BuyBackOffer>(&offer_key(&existing_id))? {
                if existing.is_live(now) {
                    return Ok(false);
                }
            }
            batch.delete(offer_key(&existing_id));
        }

        batch.put(offer_key(&offer.id), encode(&offer)?);
        batch.put(index, encode(&offer.id)?);
        self.db
            .write(batch)
            .map_err(|e| StorageError::WriteFailed(e.to_string()))?;
        Ok(true)
    }

    async fn load_offer(&self, id: &str) -> CasinoResult<Option<BuyBackOffer>> {
        self.get(&offer_key(id))
    }

    async fn take_offer(&self, id: &str) -> CasinoResult<Option<BuyBackOffer>> {
        let _guard = self.write_lock.lock().await;
        let Some(offer) = self.get::<BuyBackOffer>(&offer_key(id))? else {
            return Ok(None);
        };
        self.remove_offer(&offer)?;
        Ok(Some(offer))
    }

    async fn offer_for_venue(&self, key: &VenueKey) -> CasinoResult<Option<BuyBackOffer>> {
        match self.get::<String>(&offer_venue_key(key))? {
            Some(id) => self.get(&offer_key(&id)),
            None => Ok(None),
        }
    }

    async fn offers_for_player(&self, player: &str) -> CasinoResult<Vec<BuyBackOffer>> {
        let mut offers: Vec<BuyBackOffer> = self
            .scan::<BuyBackOffer>(OFFER_PREFIX)?
            .into_iter()
            .filter(|o| o.new_owner == player)
            .collect();
        offers.sort_by_key(|o| o.created_at);
        Ok(offers)
    }

    async fn load_pool(&self, key: &VenueKey) -> CasinoResult<LotteryPool> {
        Ok(self.get(&lottery_key(key))?.unwrap_or_default())
    }

    async fn add_entrant(&self, key: &VenueKey, player: &str) -> CasinoResult<bool> {
        let _guard = self.write_lock.lock().await;
        let db_key = lottery_key(key);
        let mut pool: LotteryPool = self.get(&db_key)?.unwrap_or_default();
        if !pool.entrants.insert(player.to_string()) {
            return Ok(false);
        }
        self.put(&db_key, &pool)?;
        Ok(true)
    }

    async fn set_cooldown(
        &self,
        key: &VenueKey,
        player: &str,
        until: DateTime<Utc>,
    ) -> CasinoResult<()> {
        let _guard = self.write_lock.lock().await;
        let db_key = lottery_key(key);
        let mut pool: LotteryPool = self.get(&db_key)?.unwrap_or_default();
        pool.entrants.remove(player);
        pool.cooldowns.insert(player.to_string(), until);
        self.put(&db_key, &pool)
    }

    async fn complete_draw(
        &self,
        key: &VenueKey,
        drawn: &BTreeSet<PlayerId>,
        cooldowns: &[(PlayerId, DateTime<Utc>)],
        now: DateTime<Utc>,
    ) -> CasinoResult<()> {
        let _guard = self.write_lock.lock().await;
        let db_key = lottery_key(key);
        let mut pool: LotteryPool = self.get(&db_key)?.unwrap_or_default();
        finish_pool(&mut pool, drawn, cooldowns, now);
        self.put(&db_key, &pool)
    }

    async fn push_history(
        &self,
        player: &str,
        game_type: GameType,
        entry: HistoryEntry,
        limit: usize,
    ) -> CasinoResult<()> {
        let _guard = self.write_lock.lock().await;
        let db_key = history_key(player, game_type);
        let mut entries: Vec<HistoryEntry> = self.get(&db_key)?.unwrap_or_default();
        entries.insert(0, entry);
        entries.truncate(limit);
        self.put(&db_key, &entries)
    }

    async fn recent_history(
        &self,
        player: &str,
        game_type: GameType,
        limit: usize,
    ) -> CasinoResult<Vec<HistoryEntry>> {
        let mut entries: Vec<HistoryEntry> = self
            .get(&history_key(player, game_type))?
            .unwrap_or_default();
        entries.truncate(limit);
        Ok(entries)
    }
}
