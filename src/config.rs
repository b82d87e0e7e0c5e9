//! Configuration for the wagering engine.
//!
//! Centralized config with defaults, TOML file loading, environment variable
//! overrides and validation.

use crate::errors::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub slots: SlotsConfig,
    #[serde(default)]
    pub cases: CasesConfig,
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub bonus: BonusConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// Coin-flip round timing and stake bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundConfig {
    /// How long bets are accepted before the round locks.
    pub betting_window_secs: u64,
    /// Pause between locking and the outcome reveal (client animation time).
    pub reveal_delay_secs: u64,
    /// Pause after payout before a fresh round opens.
    pub cooldown_secs: u64,
    pub min_stake: f64,
    pub max_stake: f64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            betting_window_secs: 14,
            reveal_delay_secs: 5,
            cooldown_secs: 3,
            min_stake: 1.0,
            max_stake: 1_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsConfig {
    pub min_bet: f64,
    pub max_bet: f64,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            min_bet: 0.5,
            max_bet: 50_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CasesConfig {
    /// Maximum cases opened in one request.
    pub max_open_quantity: u32,
}

impl Default for CasesConfig {
    fn default() -> Self {
        Self {
            max_open_quantity: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    pub min_price: f64,
    pub max_price: f64,
    /// Minimum level to create a listing.
    pub sell_level: u32,
    /// Minimum level to buy a listing.
    pub buy_level: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            min_price: 1.0,
            max_price: 1_000_000.0,
            sell_level: 5,
            buy_level: 10,
        }
    }
}

/// Periodic balance bonus. The cooldown differed between observed platform
/// revisions (60 s vs 480 s), so it is a knob rather than a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusConfig {
    pub cooldown_secs: u64,
    /// Base amount scaled by level: floor(base * (1 + 0.1 * level)).
    pub base_amount: f64,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 480,
            base_amount: 200.0,
        }
    }
}

/// Configuration loader with file and environment variable support.
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

    /// Load configuration from file and environment variables.
    pub fn load(&self) -> EngineResult<EngineConfig> {
        let mut config = if let Some(ref path) = self.config_path {
            self.load_from_file(path)?
        } else {
            EngineConfig::default()
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> EngineResult<EngineConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!("Failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content)
            .map_err(|e| EngineError::Configuration(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut EngineConfig) -> EngineResult<()> {
        if let Ok(host) = env::var("SKINFALL_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = env::var("SKINFALL_PORT") {
            config.server.port = port.parse().map_err(|_| {
                EngineError::Configuration(format!("Invalid SKINFALL_PORT: {}", port))
            })?;
        }
        if let Ok(window) = env::var("SKINFALL_BETTING_WINDOW_SECS") {
            config.round.betting_window_secs = window.parse().map_err(|_| {
                EngineError::Configuration(format!(
                    "Invalid SKINFALL_BETTING_WINDOW_SECS: {}",
                    window
                ))
            })?;
        }
        if let Ok(cooldown) = env::var("SKINFALL_BONUS_COOLDOWN_SECS") {
            config.bonus.cooldown_secs = cooldown.parse().map_err(|_| {
                EngineError::Configuration(format!(
                    "Invalid SKINFALL_BONUS_COOLDOWN_SECS: {}",
                    cooldown
                ))
            })?;
        }

        Ok(())
    }

    /// Validate the final configuration.
    fn validate(&self, config: &EngineConfig) -> EngineResult<()> {
        if config.server.port == 0 {
            return Err(EngineError::Configuration(
                "server.port cannot be zero".to_string(),
            ));
        }
        if config.round.betting_window_secs == 0 {
            return Err(EngineError::Configuration(
                "round.betting_window_secs cannot be zero".to_string(),
            ));
        }
        if config.round.min_stake <= 0.0 || config.round.min_stake > config.round.max_stake {
            return Err(EngineError::Configuration(format!(
                "invalid round stake bounds: {}..{}",
                config.round.min_stake, config.round.max_stake
            )));
        }
        if config.slots.min_bet <= 0.0 || config.slots.min_bet > config.slots.max_bet {
            return Err(EngineError::Configuration(format!(
                "invalid slot bet bounds: {}..{}",
                config.slots.min_bet, config.slots.max_bet
            )));
        }
        if config.cases.max_open_quantity == 0 {
            return Err(EngineError::Configuration(
                "cases.max_open_quantity cannot be zero".to_string(),
            ));
        }
        if config.marketplace.min_price <= 0.0
            || config.marketplace.min_price > config.marketplace.max_price
        {
            return Err(EngineError::Configuration(format!(
                "invalid marketplace price bounds: {}..{}",
                config.marketplace.min_price, config.marketplace.max_price
            )));
        }
        if config.marketplace.sell_level > config.marketplace.buy_level {
            return Err(EngineError::Configuration(
                "marketplace.sell_level cannot exceed buy_level".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, config: &EngineConfig, path: &str) -> EngineResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            EngineError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            EngineError::Configuration(format!("Failed to write to {}: {}", path, e))
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
