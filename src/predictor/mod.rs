//! Yield and risk predictors.
//!
//! The allocation pipeline only sees the [`Predictor`] trait. Which
//! implementation backs it is decided once at startup by
//! [`select_predictor`]: a fitted model when one can be loaded, otherwise
//! the static reference table from configuration.

mod fitted;
mod static_table;

use crate::config::Config;
use crate::market_data::MetricsSource;
use crate::utils::error::Result;
use crate::utils::types::{ProtocolEstimate, ProtocolMap};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

pub use fitted::{FittedPredictor, LinearModel, ModelFile, RISK_FEATURES, YIELD_FEATURES};
pub use static_table::StaticPredictor;

/// Supplies per-protocol yield and risk estimates.
pub trait Predictor: Send + Sync {
    /// Short identifier reported by the service ("static", "fitted").
    fn name(&self) -> &'static str;

    /// Predicted APY per protocol, as a decimal.
    fn predict_yields(&self) -> Result<ProtocolMap<f64>>;

    /// Predicted risk per protocol in [0, 1], lower is better.
    fn predict_risks(&self) -> Result<ProtocolMap<f64>>;

    /// Yield and risk together. Implementations that sample market data
    /// should override this so both come from the same snapshot.
    fn predict(&self) -> Result<ProtocolMap<ProtocolEstimate>> {
        let yields = self.predict_yields()?;
        let risks = self.predict_risks()?;
        Ok(ProtocolMap::from_fn(|p| ProtocolEstimate::new(p, yields[p], risks[p])))
    }
}

/// Pick the predictor implementation for this process.
///
/// Never fails: a missing or unreadable model file falls back to the static table.
pub fn select_predictor(config: &Config, market: Arc<dyn MetricsSource>) -> Arc<dyn Predictor> {
    let fallback = || -> Arc<dyn Predictor> { Arc::new(StaticPredictor::from_config(config)) };

    let Some(model_path) = config.predictor.model_path.as_deref() else {
        info!("No model path configured; using static predictor");
        return fallback();
    };

    match FittedPredictor::load(Path::new(model_path), market, config.predictor.market_condition) {
        | Ok(Some(predictor)) => {
            info!("Loaded fitted predictor from {}", model_path);
            Arc::new(predictor)
        }
        | Ok(None) => {
            info!("No fitted model at {}; using static predictor", model_path);
            fallback()
        }
        | Err(e) => {
            warn!("Ignoring fitted model at {}: {}; using static predictor", model_path, e);
            fallback()
        }
    }
}
