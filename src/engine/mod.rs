//! Request-level allocation pipeline.
//!
//! `AllocationService` wires the predictor, the allocation engine, the
//! basis-point encoder and the confidence estimator together. It holds no
//! mutable state of its own and can be shared across request handlers.

use crate::allocation::{confidence, encode_bps, AllocationBreakdown, AllocationEngine};
use crate::config::Config;
use crate::market_data::{MetricsSource, SimulatedMarket, YieldPoint};
use crate::predictor::{select_predictor, Predictor};
use crate::risk::{average_risk, RiskLevel};
use crate::utils::error::Result;
use crate::utils::types::{EncodedAllocation, ProtocolId, ProtocolMap};
use chrono::{SecondsFormat, Utc};
use log::debug;
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Allocation recommendation returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    /// Basis points per protocol, summing to 10_000.
    pub allocation: EncodedAllocation,
    pub predicted_yields: ProtocolMap<f64>,
    pub risk_scores: ProtocolMap<f64>,
    pub confidence: f64,
}

/// Portfolio risk summary.
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub risk_scores: ProtocolMap<f64>,
    pub overall_risk: RiskLevel,
    pub recommendation: String,
}

/// Yield predictions with the time they were produced.
#[derive(Debug, Clone, Serialize)]
pub struct YieldSnapshot {
    pub predicted_yields: ProtocolMap<f64>,
    /// RFC 3339 / ISO-8601
    pub timestamp: String,
}

/// Historical APY series for one protocol.
#[derive(Debug, Clone, Serialize)]
pub struct HistoricalYields {
    pub protocol: ProtocolId,
    pub data: Vec<YieldPoint>,
    pub days: u32,
}

pub struct AllocationService {
    predictor: Arc<dyn Predictor>,
    market: Arc<SimulatedMarket>,
    engine: AllocationEngine,
    confidence_scale: f64,
    default_history_days: u32,
}

impl std::fmt::Debug for AllocationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllocationService")
            .field("predictor", &self.predictor.name())
            .field("engine", &self.engine)
            .field("confidence_scale", &self.confidence_scale)
            .finish()
    }
}

impl AllocationService {
    /// Build the service with an explicit predictor and market.
    pub fn new(
        config: &Config, predictor: Arc<dyn Predictor>, market: Arc<SimulatedMarket>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            predictor,
            market,
            engine: AllocationEngine::new(config.allocation.min_share)?,
            confidence_scale: config.allocation.confidence_scale,
            default_history_days: config.history.default_days,
        })
    }

    /// Build the service from configuration, selecting the predictor once.
    pub fn from_config(config: &Config) -> Result<Self> {
        let market = Arc::new(SimulatedMarket::from_config(config));
        let predictor = select_predictor(config, market.clone() as Arc<dyn MetricsSource>);
        Self::new(config, predictor, market)
    }

    pub fn predictor_name(&self) -> &'static str {
        self.predictor.name()
    }

    /// Predict, allocate, encode, and score confidence.
    pub fn recommend(&self) -> Result<Recommendation> {
        let start = Instant::now();
        let estimates = self.predictor.predict()?;
        let yields = estimates.map(|_, e| e.yield_estimate);
        let risks = estimates.map(|_, e| e.risk);

        let breakdown: AllocationBreakdown = self.engine.allocate_detailed(&yields, &risks)?;
        if !breakdown.floored.is_empty() {
            counter!(crate::metrics::FLOOR_ACTIVATIONS, breakdown.floored.len() as u64);
        }
        let allocation = encode_bps(&breakdown.weights);
        let confidence = confidence(&yields, self.confidence_scale);

        histogram!(crate::metrics::COMPUTE_MS, start.elapsed().as_secs_f64() * 1000.0);
        debug!(
            "Recommendation via {} predictor: {:?} (confidence {:.4})",
            self.predictor.name(),
            allocation,
            confidence
        );

        Ok(Recommendation { allocation, predicted_yields: yields, risk_scores: risks, confidence })
    }

    /// Classify overall risk from the predicted risk scores.
    pub fn risk_report(&self) -> Result<RiskReport> {
        let risks = self.predictor.predict_risks()?.map(|_, r| r.clamp(0.0, 1.0));
        let overall_risk = RiskLevel::classify(average_risk(&risks));
        Ok(RiskReport {
            risk_scores: risks,
            overall_risk,
            recommendation: overall_risk.recommendation().to_string(),
        })
    }

    pub fn yields(&self) -> Result<YieldSnapshot> {
        Ok(YieldSnapshot {
            predicted_yields: self.predictor.predict_yields()?,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        })
    }

    /// Historical series for a protocol name (any casing).
    ///
    /// The name is validated before anything else runs.
    pub fn history(&self, protocol: &str, days: Option<u32>) -> Result<HistoricalYields> {
        let protocol: ProtocolId = protocol.parse()?;
        let days = days.unwrap_or(self.default_history_days);
        let data = self.market.historical_yields(protocol, days, Utc::now())?;
        Ok(HistoricalYields { protocol, data, days })
    }
}
