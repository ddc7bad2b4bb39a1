//! Configuration management for the casino engine
//!
//! One TOML document, loaded from file, overridden from the environment and
//! validated before being injected into every component.

use crate::errors::{CasinoResult, ConfigurationError};
use crate::games::types::GameType;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// What happens when an owner cannot cover a win and no buy-back reward is set
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShortfallPolicy {
    /// Owner pays what they have and loses the venue to the house
    ForceUnowned,
    /// Owner pays what they have and keeps the venue
    KeepOwner,
}

/// Stake, ownership and shortfall rules for one venue type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VenueRules {
    pub default_max_bet: i64,
    pub min_max_bet: i64,
    pub max_max_bet: i64,
    pub min_buy_back_reward: i64,
    pub max_buy_back_reward: i64,
    pub claim_cost: i64,
    /// Venues of this type one player may own at once
    pub ownership_cap: usize,
    pub shortfall_policy: ShortfallPolicy,
}

impl VenueRules {
    fn standard(shortfall_policy: ShortfallPolicy) -> Self {
        Self {
            default_max_bet: 5_000_000,
            min_max_bet: 1_000,
            max_max_bet: 100_000_000,
            min_buy_back_reward: 0,
            max_buy_back_reward: 100_000,
            claim_cost: 1_000_000,
            ownership_cap: 1,
            shortfall_policy,
        }
    }

    pub fn clamp_max_bet(&self, requested: i64) -> i64 {
        requested.clamp(self.min_max_bet, self.max_max_bet)
    }

    pub fn clamp_buy_back_reward(&self, requested: i64) -> i64 {
        requested.clamp(self.min_buy_back_reward, self.max_buy_back_reward)
    }
}

/// Per-venue-type rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamesConfig {
    pub dice: VenueRules,
    pub roulette: VenueRules,
    pub blackjack: VenueRules,
    pub horse_racing: VenueRules,
    pub video_poker: VenueRules,
    pub slots: VenueRules,
}

impl Default for GamesConfig {
    fn default() -> Self {
        let mut slots = VenueRules::standard(ShortfallPolicy::KeepOwner);
        slots.default_max_bet = 1_000_000;
        slots.claim_cost = 500_000;

        Self {
            dice: VenueRules::standard(ShortfallPolicy::ForceUnowned),
            roulette: VenueRules::standard(ShortfallPolicy::ForceUnowned),
            blackjack: VenueRules::standard(ShortfallPolicy::ForceUnowned),
            horse_racing: VenueRules::standard(ShortfallPolicy::ForceUnowned),
            video_poker: VenueRules::standard(ShortfallPolicy::ForceUnowned),
            slots,
        }
    }
}

impl GamesConfig {
    pub fn rules(&self, game_type: GameType) -> &VenueRules {
        match game_type {
            GameType::Dice => &self.dice,
            GameType::Roulette => &self.roulette,
            GameType::Blackjack => &self.blackjack,
            GameType::HorseRacing => &self.horse_racing,
            GameType::VideoPoker => &self.video_poker,
            GameType::Slots => &self.slots,
        }
    }

    pub fn rules_mut(&mut self, game_type: GameType) -> &mut VenueRules {
        match game_type {
            GameType::Dice => &mut self.dice,
            GameType::Roulette => &mut self.roulette,
            GameType::Blackjack => &mut self.blackjack,
            GameType::HorseRacing => &mut self.horse_racing,
            GameType::VideoPoker => &mut self.video_poker,
            GameType::Slots => &mut self.slots,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiceConfig {
    pub house_edge_bps: u32,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self { house_edge_bps: 500 }
    }
}

/// One horse in the race field, paying `odds` to 1
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Runner {
    pub name: String,
    pub odds: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorseRacingConfig {
    pub house_edge_bps: u32,
    pub field: Vec<Runner>,
}

impl Default for HorseRacingConfig {
    fn default() -> Self {
        let runner = |name: &str, odds| Runner {
            name: name.to_string(),
            odds,
        };
        Self {
            house_edge_bps: 500,
            field: vec![
                runner("Sure Thing", 1),
                runner("Back Alley", 2),
                runner("Getaway Car", 3),
                runner("Loan Shark", 5),
                runner("Hot Wheels", 8),
                runner("Long Shot", 12),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyBackConfig {
    pub offer_ttl_secs: u64,
}

impl Default for BuyBackConfig {
    fn default() -> Self {
        Self { offer_ttl_secs: 120 }
    }
}

impl BuyBackConfig {
    pub fn offer_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.offer_ttl_secs as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotteryConfig {
    /// One ownership term; also the length of a previous owner's cooldown
    pub term_secs: u64,
}

impl Default for LotteryConfig {
    fn default() -> Self {
        Self { term_secs: 86_400 }
    }
}

impl LotteryConfig {
    pub fn term(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.term_secs as i64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { limit: 15 }
    }
}

/// Venue read-through cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 4_096,
            ttl_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_secs: 30,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Rocksdb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: "./DB/venue_casino".to_string(),
        }
    }
}

/// Opening balances for the in-process balance ledger used by the dev server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalancesConfig {
    pub opening_cash: i64,
    pub opening_points: i64,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub games: GamesConfig,
    pub dice: DiceConfig,
    pub horse_racing: HorseRacingConfig,
    pub buy_back: BuyBackConfig,
    pub lottery: LotteryConfig,
    pub history: HistoryConfig,
    pub cache: CacheConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub balances: BalancesConfig,
}

/// Configuration loader with environment variable support
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            CasinoConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into()
        })
    }

    fn apply_env_overrides(&self, config: &mut CasinoConfig) -> CasinoResult<()> {
        if let Ok(host) = env::var("VENUE_CASINO_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env("VENUE_CASINO_PORT", "Invalid port number")? {
            config.server.port = port;
        }
        if let Ok(dir) = env::var("VENUE_CASINO_DATA_DIR") {
            config.storage.data_dir = dir;
        }
        if let Ok(backend) = env::var("VENUE_CASINO_STORAGE") {
            config.storage.backend = match backend.as_str() {
                "memory" => StorageBackend::Memory,
                "rocksdb" => StorageBackend::Rocksdb,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "VENUE_CASINO_STORAGE".to_string(),
                        value: backend,
                        reason: "Expected 'memory' or 'rocksdb'".to_string(),
                    }
                    .into())
                }
            };
        }
        if let Some(ttl) = parse_env("VENUE_CASINO_OFFER_TTL_SECS", "Invalid duration")? {
            config.buy_back.offer_ttl_secs = ttl;
        }
        if let Some(term) = parse_env("VENUE_CASINO_LOTTERY_TERM_SECS", "Invalid duration")? {
            config.lottery.term_secs = term;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &CasinoConfig) -> CasinoResult<()> {
        for game in GameType::ALL {
            let rules = config.games.rules(game);
            let field = |name: &str| format!("games.{}.{}", game, name);

            if rules.min_max_bet <= 0 || rules.min_max_bet > rules.max_max_bet {
                return Err(invalid(
                    field("min_max_bet"),
                    rules.min_max_bet,
                    "Must be positive and not above max_max_bet",
                ));
            }
            if rules.default_max_bet < rules.min_max_bet || rules.default_max_bet > rules.max_max_bet
            {
                return Err(invalid(
                    field("default_max_bet"),
                    rules.default_max_bet,
                    "Must lie within min_max_bet..=max_max_bet",
                ));
            }
            if rules.min_buy_back_reward < 0
                || rules.min_buy_back_reward > rules.max_buy_back_reward
            {
                return Err(invalid(
                    field("min_buy_back_reward"),
                    rules.min_buy_back_reward,
                    "Must be non-negative and not above max_buy_back_reward",
                ));
            }
            if rules.claim_cost < 0 {
                return Err(invalid(field("claim_cost"), rules.claim_cost, "Cannot be negative"));
            }
            if rules.ownership_cap == 0 {
                return Err(invalid(field("ownership_cap"), 0, "Cap must be at least 1"));
            }
        }

        // Keeps every winning multiplier at or above 1x
        if config.dice.house_edge_bps > 5_000 {
            return Err(invalid(
                "dice.house_edge_bps".to_string(),
                config.dice.house_edge_bps,
                "House edge cannot exceed 50%",
            ));
        }
        if config.horse_racing.house_edge_bps > 5_000 {
            return Err(invalid(
                "horse_racing.house_edge_bps".to_string(),
                config.horse_racing.house_edge_bps,
                "House edge cannot exceed 50%",
            ));
        }
        if config.horse_racing.field.len() < 2 {
            return Err(ConfigurationError::ValidationFailed(
                "horse_racing.field needs at least two runners".to_string(),
            )
            .into());
        }
        if let Some(runner) = config.horse_racing.field.iter().find(|r| r.odds == 0) {
            return Err(invalid(
                format!("horse_racing.field.{}", runner.name),
                runner.odds,
                "Odds must be at least 1",
            ));
        }

        if config.buy_back.offer_ttl_secs == 0 {
            return Err(invalid("buy_back.offer_ttl_secs".to_string(), 0, "TTL cannot be zero"));
        }
        if config.lottery.term_secs == 0 {
            return Err(invalid("lottery.term_secs".to_string(), 0, "Term cannot be zero"));
        }
        if config.history.limit == 0 || config.history.limit > 50 {
            return Err(invalid(
                "history.limit".to_string(),
                config.history.limit,
                "Must be within 1..=50",
            ));
        }
        if config.cache.capacity == 0 {
            return Err(invalid("cache.capacity".to_string(), 0, "Cache size cannot be zero"));
        }
        if config.server.port == 0 {
            return Err(invalid("server.port".to_string(), 0, "Port cannot be zero"));
        }
        if config.storage.backend == StorageBackend::Rocksdb && config.storage.data_dir.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_dir".to_string()).into());
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &CasinoConfig, path: &str) -> CasinoResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into()
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, reason: &str) -> CasinoResult<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| {
            ConfigurationError::InvalidValue {
                field: name.to_string(),
                value: raw,
                reason: reason.to_string(),
            }
            .into()
        }),
        Err(_) => Ok(None),
    }
}

fn invalid(field: String, value: impl ToString, reason: &str) -> crate::errors::CasinoError {
    ConfigurationError::InvalidValue {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}

/// Builder pattern for creating configurations
pub struct ConfigBuilder {
    config: CasinoConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: CasinoConfig::default(),
        }
    }

    pub fn rules(mut self, game_type: GameType, rules: VenueRules) -> Self {
        *self.config.games.rules_mut(game_type) = rules;
        self
    }

    pub fn shortfall_policy(mut self, game_type: GameType, policy: ShortfallPolicy) -> Self {
        self.config.games.rules_mut(game_type).shortfall_policy = policy;
        self
    }

    pub fn claim_cost(mut self, game_type: GameType, cost: i64) -> Self {
        self.config.games.rules_mut(game_type).claim_cost = cost;
        self
    }

    pub fn dice(mut self, dice: DiceConfig) -> Self {
        self.config.dice = dice;
        self
    }

    pub fn horse_racing(mut self, horse_racing: HorseRacingConfig) -> Self {
        self.config.horse_racing = horse_racing;
        self
    }

    pub fn offer_ttl_secs(mut self, secs: u64) -> Self {
        self.config.buy_back.offer_ttl_secs = secs;
        self
    }

    pub fn lottery_term_secs(mut self, secs: u64) -> Self {
        self.config.lottery.term_secs = secs;
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history.limit = limit;
        self
    }

    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.config.cache = cache;
        self
    }

    pub fn server(mut self, server: ServerConfig) -> Self {
        self.config.server = server;
        self
    }

    pub fn storage(mut self, storage: StorageConfig) -> Self {
        self.config.storage = storage;
        self
    }

    pub fn balances(mut self, balances: BalancesConfig) -> Self {
        self.config.balances = balances;
        self
    }

    pub fn build(self) -> CasinoConfig {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> CasinoResult<()> {
    let config = CasinoConfig::default();
    ConfigLoader::new().save(&config, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CasinoConfig::default();
        assert_eq!(config.buy_back.offer_ttl_secs, 120);
        assert_eq!(config.games.roulette.default_max_bet, 5_000_000);
        assert_eq!(config.games.slots.shortfall_policy, ShortfallPolicy::KeepOwner);
        assert_eq!(config.games.dice.shortfall_policy, ShortfallPolicy::ForceUnowned);
        assert!(ConfigLoader::new().validate(&config).is_ok());
    }

    #[test]
    fn test_config_validation() {
        let loader = ConfigLoader::new();
        let mut config = CasinoConfig::default();

        config.games.dice.default_max_bet = config.games.dice.max_max_bet + 1;
        assert!(loader.validate(&config).is_err());

        let mut config = CasinoConfig::default();
        config.horse_racing.field[0].odds = 0;
        assert!(loader.validate(&config).is_err());

        let mut config = CasinoConfig::default();
        config.history.limit = 0;
        assert!(loader.validate(&config).is_err());

        let mut config = CasinoConfig::default();
        config.dice.house_edge_bps = 6_000;
        assert!(loader.validate(&config).is_err());
    }

    #[test]
    fn test_clamping() {
        let rules = CasinoConfig::default().games.roulette;
        assert_eq!(rules.clamp_max_bet(1), rules.min_max_bet);
        assert_eq!(rules.clamp_max_bet(i64::MAX), rules.max_max_bet);
        assert_eq!(rules.clamp_buy_back_reward(-5), 0);
        assert_eq!(rules.clamp_buy_back_reward(5_000), 5_000);
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .shortfall_policy(GameType::Roulette, ShortfallPolicy::KeepOwner)
            .offer_ttl_secs(30)
            .history_limit(10)
            .build();

        assert_eq!(config.games.roulette.shortfall_policy, ShortfallPolicy::KeepOwner);
        assert_eq!(config.buy_back.offer_ttl_secs, 30);
        assert_eq!(config.history.limit, 10);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CasinoConfig = toml::from_str(
            r#"
            [lottery]
            term_secs = 3600
            "#,
        )
        .unwrap();

        assert_eq!(config.lottery.term_secs, 3_600);
        assert_eq!(config.buy_back.offer_ttl_secs, 120);
    }

    #[test]
    fn test_save_and_load_config() -> CasinoResult<()> {
        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap();

        let original = CasinoConfig::default();
        ConfigLoader::new().save(&original, path)?;

        let loaded = ConfigLoader::new().with_path(path).load()?;
        assert_eq!(loaded.server.port, original.server.port);
        assert_eq!(loaded.games.slots, original.games.slots);
        assert_eq!(loaded.horse_racing.field, original.horse_racing.field);

        Ok(())
    }
}
