//! Simulated protocol metrics.
//!
//! Stands in for subgraph / RPC queries: samples current APY, volatility and
//! risk around each protocol's reference profile, and synthesises historical
//! APY series with a mild trend.

use crate::config::{Config, HistoryConfig, ProtocolProfile};
use crate::utils::error::{Error, Result};
use crate::utils::types::{ProtocolId, ProtocolMap};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

const APY_NOISE_STD: f64 = 0.001;
const VOLATILITY_NOISE_STD: f64 = 0.01;
const RISK_NOISE_STD: f64 = 0.02;

/// Point-in-time metrics for one protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtocolMetrics {
    pub protocol: ProtocolId,
    pub apy: f64,
    pub tvl: f64,
    pub volatility: f64,
    pub risk_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// One day of a historical APY series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldPoint {
    pub date: DateTime<Utc>,
    #[serde(rename = "yield")]
    pub apy: f64,
}

/// Source of current protocol metrics.
pub trait MetricsSource: Send + Sync {
    fn current_metrics(&self) -> Result<ProtocolMap<ProtocolMetrics>>;
}

/// Metrics sampled around configured reference profiles.
pub struct SimulatedMarket {
    profiles: ProtocolMap<ProtocolProfile>,
    history: HistoryConfig,
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for SimulatedMarket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedMarket")
            .field("profiles", &self.profiles)
            .field("history", &self.history)
            .finish()
    }
}

impl SimulatedMarket {
    pub fn new(profiles: ProtocolMap<ProtocolProfile>, history: HistoryConfig) -> Self {
        Self { profiles, history, rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Deterministic market for reproducible runs.
    pub fn with_seed(profiles: ProtocolMap<ProtocolProfile>, history: HistoryConfig, seed: u64) -> Self {
        Self { profiles, history, rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.protocols, config.history.clone())
    }

    /// Daily APY series ending at `end`, oldest first.
    pub fn historical_yields(
        &self, protocol: ProtocolId, days: u32, end: DateTime<Utc>,
    ) -> Result<Vec<YieldPoint>> {
        if days == 0 || days > self.history.max_days {
            return Err(Error::InvalidArgument(format!(
                "days must be between 1 and {}, got {}",
                self.history.max_days, days
            )));
        }
        let noise = normal(self.history.noise_std)?;
        let base_apy = self.profiles[protocol].base_apy;
        let mut rng = self.lock_rng()?;

        let points = (0..days)
            .map(|i| {
                let age = (days - 1 - i) as i64;
                let trend = self.history.trend_per_day * (days - i) as f64;
                YieldPoint {
                    date: end - Duration::days(age),
                    apy: base_apy + noise.sample(&mut *rng) + trend,
                }
            })
            .collect();
        Ok(points)
    }

    fn lock_rng(&self) -> Result<std::sync::MutexGuard<'_, StdRng>> {
        self.rng.lock().map_err(|_| Error::DataError("market rng lock poisoned".to_string()))
    }
}

impl MetricsSource for SimulatedMarket {
    fn current_metrics(&self) -> Result<ProtocolMap<ProtocolMetrics>> {
        let apy_noise = normal(APY_NOISE_STD)?;
        let vol_noise = normal(VOLATILITY_NOISE_STD)?;
        let risk_noise = normal(RISK_NOISE_STD)?;
        let now = Utc::now();
        let mut rng = self.lock_rng()?;

        Ok(ProtocolMap::from_fn(|protocol| {
            let profile = &self.profiles[protocol];
            ProtocolMetrics {
                protocol,
                apy: profile.base_apy + apy_noise.sample(&mut *rng),
                tvl: profile.tvl,
                volatility: (profile.volatility + vol_noise.sample(&mut *rng)).max(0.0),
                risk_score: (profile.risk_score + risk_noise.sample(&mut *rng)).clamp(0.0, 1.0),
                timestamp: now,
            }
        }))
    }
}

fn normal(std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(0.0, std_dev)
        .map_err(|e| Error::DataError(format!("invalid noise std {}: {}", std_dev, e)))
}
