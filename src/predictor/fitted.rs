//! Predictor backed by standard-scaled linear models loaded from JSON.

use super::Predictor;
use crate::market_data::{MetricsSource, ProtocolMetrics};
use crate::utils::error::{Error, Result};
use crate::utils::types::{ProtocolEstimate, ProtocolMap};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Yield model inputs: protocol index, apy, ln(tvl), volatility, market condition.
pub const YIELD_FEATURES: usize = 5;
/// Risk model inputs: protocol index, apy, ln(tvl), volatility.
pub const RISK_FEATURES: usize = 4;

/// `intercept + Σ coef_i * (x_i - mean_i) / scale_i`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    /// Model that ignores its inputs.
    pub fn constant(features: usize, value: f64) -> Self {
        Self {
            means: vec![0.0; features],
            scales: vec![1.0; features],
            coefficients: vec![0.0; features],
            intercept: value,
        }
    }

    fn check(&self, features: usize, name: &str) -> Result<()> {
        let lens = [self.means.len(), self.scales.len(), self.coefficients.len()];
        if lens.iter().any(|l| *l != features) {
            return Err(Error::PredictorError(format!(
                "{} expects {} features, file has means/scales/coefficients of {:?}",
                name, features, lens
            )));
        }
        let finite = self.intercept.is_finite()
            && self.means.iter().chain(&self.scales).chain(&self.coefficients).all(|v| v.is_finite());
        if !finite {
            return Err(Error::PredictorError(format!("{} has non-finite parameters", name)));
        }
        Ok(())
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let linear: f64 = features
            .iter()
            .zip(&self.means)
            .zip(&self.scales)
            .zip(&self.coefficients)
            .filter(|(((_, _), scale), _)| **scale != 0.0)
            .map(|(((x, mean), scale), coef)| coef * (x - mean) / scale)
            .sum();
        self.intercept + linear
    }
}

/// On-disk layout of a fitted model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    pub yield_model: LinearModel,
    pub risk_model: LinearModel,
}

/// Predicts from live (simulated) metrics through the fitted models.
pub struct FittedPredictor {
    models: ModelFile,
    market: Arc<dyn MetricsSource>,
    market_condition: f64,
}

impl std::fmt::Debug for FittedPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FittedPredictor")
            .field("models", &self.models)
            .field("market_condition", &self.market_condition)
            .finish()
    }
}

impl FittedPredictor {
    pub fn new(
        models: ModelFile, market: Arc<dyn MetricsSource>, market_condition: f64,
    ) -> Result<Self> {
        models.yield_model.check(YIELD_FEATURES, "yield_model")?;
        models.risk_model.check(RISK_FEATURES, "risk_model")?;
        Ok(Self { models, market, market_condition })
    }

    /// Load a model file. `Ok(None)` when the file does not exist.
    pub fn load(
        path: &Path, market: Arc<dyn MetricsSource>, market_condition: f64,
    ) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let models: ModelFile = serde_json::from_str(&content)?;
        Self::new(models, market, market_condition).map(Some)
    }

    fn base_features(m: &ProtocolMetrics) -> [f64; RISK_FEATURES] {
        let log_tvl = if m.tvl > 0.0 { m.tvl.ln() } else { 0.0 };
        [m.protocol.index() as f64, m.apy, log_tvl, m.volatility]
    }

    fn yield_for(&self, m: &ProtocolMetrics) -> f64 {
        let [idx, apy, log_tvl, vol] = Self::base_features(m);
        let x = [idx, apy, log_tvl, vol, self.market_condition];
        self.models.yield_model.predict(&x).max(0.0)
    }

    fn risk_for(&self, m: &ProtocolMetrics) -> f64 {
        self.models.risk_model.predict(&Self::base_features(m)).clamp(0.0, 1.0)
    }
}

impl Predictor for FittedPredictor {
    fn name(&self) -> &'static str {
        "fitted"
    }

    fn predict_yields(&self) -> Result<ProtocolMap<f64>> {
        let metrics = self.market.current_metrics()?;
        Ok(metrics.map(|_, m| self.yield_for(m)))
    }

    fn predict_risks(&self) -> Result<ProtocolMap<f64>> {
        let metrics = self.market.current_metrics()?;
        Ok(metrics.map(|_, m| self.risk_for(m)))
    }

    fn predict(&self) -> Result<ProtocolMap<ProtocolEstimate>> {
        let metrics = self.market.current_metrics()?;
        Ok(metrics.map(|p, m| ProtocolEstimate::new(p, self.yield_for(m), self.risk_for(m))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::types::ProtocolId;
    use assert_matches::assert_matches;
    use chrono::Utc;

    struct FixedMarket;

    impl MetricsSource for FixedMarket {
        fn current_metrics(&self) -> Result<ProtocolMap<ProtocolMetrics>> {
            Ok(ProtocolMap::from_fn(|protocol| ProtocolMetrics {
                protocol,
                apy: 0.06 + 0.01 * protocol.index() as f64,
                tvl: std::f64::consts::E,
                volatility: 0.2,
                risk_score: 0.3,
                timestamp: Utc::now(),
            }))
        }
    }

    fn models() -> ModelFile {
        ModelFile {
            // yield = 0.01 + apy
            yield_model: LinearModel {
                means: vec![0.0; YIELD_FEATURES],
                scales: vec![1.0; YIELD_FEATURES],
                coefficients: vec![0.0, 1.0, 0.0, 0.0, 0.0],
                intercept: 0.01,
            },
            // risk = 0.1 + 0.5 * ln(tvl) + volatility
            risk_model: LinearModel {
                means: vec![0.0; RISK_FEATURES],
                scales: vec![1.0, 1.0, 2.0, 1.0],
                coefficients: vec![0.0, 0.0, 1.0, 1.0],
                intercept: 0.1,
            },
        }
    }

    #[test]
    fn test_linear_model_scaling() {
        let model = LinearModel {
            means: vec![1.0, 2.0],
            scales: vec![2.0, 0.0],
            coefficients: vec![3.0, 100.0],
            intercept: 0.5,
        };
        // zero scale contributes nothing
        assert!((model.predict(&[5.0, 9.0]) - (0.5 + 3.0 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_predictions_use_market_features() {
        let predictor = FittedPredictor::new(models(), Arc::new(FixedMarket), 0.7).unwrap();
        let yields = predictor.predict_yields().unwrap();
        let risks = predictor.predict_risks().unwrap();
        assert!((yields[ProtocolId::Aave] - 0.07).abs() < 1e-12);
        assert!((yields[ProtocolId::Uniswap] - 0.10).abs() < 1e-12);
        assert!((risks[ProtocolId::Spark] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_outputs_are_clamped() {
        let models = ModelFile {
            yield_model: LinearModel::constant(YIELD_FEATURES, -0.4),
            risk_model: LinearModel::constant(RISK_FEATURES, 3.0),
        };
        let predictor = FittedPredictor::new(models, Arc::new(FixedMarket), 0.7).unwrap();
        let estimates = predictor.predict().unwrap();
        for (_, e) in estimates.iter() {
            assert_eq!(e.yield_estimate, 0.0);
            assert_eq!(e.risk, 1.0);
        }
    }

    #[test]
    fn test_feature_mismatch_rejected() {
        let models = ModelFile {
            yield_model: LinearModel::constant(RISK_FEATURES, 0.07),
            risk_model: LinearModel::constant(RISK_FEATURES, 0.3),
        };
        assert_matches!(
            FittedPredictor::new(models, Arc::new(FixedMarket), 0.7),
            Err(Error::PredictorError(msg)) if msg.contains("yield_model")
        );
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = FittedPredictor::load(&dir.path().join("nope.json"), Arc::new(FixedMarket), 0.7)
            .unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_round_trips_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictors.json");
        std::fs::write(&path, serde_json::to_string_pretty(&models()).unwrap()).unwrap();
        let loaded = FittedPredictor::load(&path, Arc::new(FixedMarket), 0.7).unwrap().unwrap();
        assert_eq!(loaded.models, models());
    }
}
