//! Configuration module for the allocation service

mod template;

use crate::utils::error::{Error, Result};
use crate::utils::types::{ProtocolId, ProtocolMap};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

pub use template::{generate_commented_config_template, generate_config_template};

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration file version
    pub version: String,

    /// General application settings
    pub app: AppConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Allocation engine parameters
    pub allocation: AllocationConfig,

    /// Predictor selection
    pub predictor: PredictorConfig,

    /// Historical series generation
    pub history: HistoryConfig,

    /// Per-protocol reference profile, also the static fallback table
    pub protocols: ProtocolMap<ProtocolProfile>,
}

/// Application-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level (debug, info, warn, error)
    pub log_level: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,

    /// Port to bind
    pub port: u16,

    /// Bind an ephemeral port when `port` is taken
    pub fallback_to_random_port: bool,
}

/// Allocation engine parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Diversification floor per protocol (0.05 = 5%)
    pub min_share: f64,

    /// Scale applied to yield variance when deriving confidence
    pub confidence_scale: f64,
}

/// Predictor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Path to a fitted model file (JSON). Static table is used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,

    /// Market condition feature fed to the yield model (0-1)
    pub market_condition: f64,
}

/// Historical yield series configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Days returned when the caller does not ask for a length
    pub default_days: u32,

    /// Longest series a caller may request
    pub max_days: u32,

    /// Linear trend added per day of age
    pub trend_per_day: f64,

    /// Standard deviation of daily noise
    pub noise_std: f64,
}

/// Reference metrics for one protocol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtocolProfile {
    /// Base APY as a decimal (0.072 = 7.2%)
    pub base_apy: f64,

    /// Total value locked in USD
    pub tvl: f64,

    /// Yield volatility
    pub volatility: f64,

    /// Risk score in [0, 1], lower is better
    pub risk_score: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            app: AppConfig::default(),
            server: ServerConfig::default(),
            allocation: AllocationConfig::default(),
            predictor: PredictorConfig::default(),
            history: HistoryConfig::default(),
            protocols: default_protocol_profiles(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string() }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8000, fallback_to_random_port: false }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self { min_share: 0.05, confidence_scale: 100.0 }
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self { model_path: Some("models/predictors.json".to_string()), market_condition: 0.7 }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { default_days: 30, max_days: 3650, trend_per_day: 0.0001, noise_std: 0.005 }
    }
}

/// Reference profiles for the supported protocols.
pub fn default_protocol_profiles() -> ProtocolMap<ProtocolProfile> {
    ProtocolMap::from_fn(|p| match p {
        | ProtocolId::Aave => {
            ProtocolProfile { base_apy: 0.072, tvl: 5_000_000.0, volatility: 0.15, risk_score: 0.30 }
        }
        | ProtocolId::Morpho => {
            ProtocolProfile { base_apy: 0.068, tvl: 3_000_000.0, volatility: 0.12, risk_score: 0.25 }
        }
        | ProtocolId::Spark => {
            ProtocolProfile { base_apy: 0.070, tvl: 2_000_000.0, volatility: 0.18, risk_score: 0.35 }
        }
        | ProtocolId::Uniswap => {
            ProtocolProfile { base_apy: 0.065, tvl: 4_000_000.0, volatility: 0.20, risk_score: 0.40 }
        }
    })
}

impl Config {
    /// Serialize default config to TOML string
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a specific file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::ConfigError(format!("Failed to read config file {:?}: {}", path.as_ref(), e))
        })?;
        let mut cfg: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;
        cfg.merge_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save the configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        // Create parent directories if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
        std::fs::write(path, content).map_err(|e| {
            Error::ConfigError(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate the configuration for required fields and reasonable values
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(Error::ConfigError(
                "Config version must be set (e.g., '0.1.0')".to_string(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(Error::ConfigError("server.host must be set".to_string()));
        }

        let min_share = self.allocation.min_share;
        if !(0.0..1.0).contains(&min_share) {
            return Err(Error::ConfigError(format!(
                "allocation.min_share must be in [0, 1), got {}",
                min_share
            )));
        }
        if min_share * ProtocolId::COUNT as f64 > 1.0 {
            return Err(Error::ConfigError(format!(
                "allocation.min_share {} cannot be honoured for {} protocols",
                min_share,
                ProtocolId::COUNT
            )));
        }
        if !(self.allocation.confidence_scale > 0.0) {
            return Err(Error::ConfigError("allocation.confidence_scale must be > 0".to_string()));
        }

        if !(0.0..=1.0).contains(&self.predictor.market_condition) {
            return Err(Error::ConfigError(
                "predictor.market_condition must be in [0, 1]".to_string(),
            ));
        }

        for (protocol, profile) in self.protocols.iter() {
            if !(0.0..=1.0).contains(&profile.risk_score) {
                return Err(Error::ConfigError(format!(
                    "protocols.{}.risk_score must be in [0, 1]",
                    protocol
                )));
            }
            if profile.base_apy < 0.0 {
                return Err(Error::ConfigError(format!(
                    "protocols.{}.base_apy cannot be negative",
                    protocol
                )));
            }
            if !(profile.tvl > 0.0) {
                return Err(Error::ConfigError(format!("protocols.{}.tvl must be > 0", protocol)));
            }
            if profile.volatility < 0.0 {
                return Err(Error::ConfigError(format!(
                    "protocols.{}.volatility cannot be negative",
                    protocol
                )));
            }
        }

        if self.history.default_days == 0 || self.history.default_days > self.history.max_days {
            return Err(Error::ConfigError(
                "history.default_days must be in 1..=history.max_days".to_string(),
            ));
        }
        if self.history.noise_std < 0.0 {
            return Err(Error::ConfigError("history.noise_std cannot be negative".to_string()));
        }
        Ok(())
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        // Try to load from current directory
        let local = Path::new("config.toml");
        if local.exists() {
            return Self::from_file(local);
        }

        // Try to load from user config directory
        if let Some(mut path) = dirs::config_dir() {
            path.push("yield_allocator");
            path.push("config.toml");
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return default config if no config file found
        let mut config = Self::default();
        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Merge environment variables into the configuration
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(host) = env::var("YIELD_ALLOCATOR_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = env::var("YIELD_ALLOCATOR_PORT") {
            self.server.port = port.parse().map_err(|e| {
                Error::ConfigError(format!("YIELD_ALLOCATOR_PORT '{}' is not a port: {}", port, e))
            })?;
        }

        if let Ok(model_path) = env::var("YIELD_ALLOCATOR_MODEL_PATH") {
            self.predictor.model_path = if model_path.trim().is_empty() { None } else { Some(model_path) };
        }

        if let Ok(level) = env::var("YIELD_ALLOCATOR_LOG_LEVEL") {
            self.app.log_level = level;
        }

        Ok(())
    }
}
