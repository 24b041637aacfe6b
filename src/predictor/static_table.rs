//! Fallback predictor backed by the configured reference table.

use super::Predictor;
use crate::config::{Config, ProtocolProfile};
use crate::utils::error::Result;
use crate::utils::types::ProtocolMap;

/// Returns each protocol's configured base APY and risk score unchanged.
#[derive(Debug, Clone)]
pub struct StaticPredictor {
    yields: ProtocolMap<f64>,
    risks: ProtocolMap<f64>,
}

impl StaticPredictor {
    pub fn new(yields: ProtocolMap<f64>, risks: ProtocolMap<f64>) -> Self {
        Self { yields, risks }
    }

    pub fn from_profiles(profiles: &ProtocolMap<ProtocolProfile>) -> Self {
        Self::new(profiles.map(|_, p| p.base_apy), profiles.map(|_, p| p.risk_score))
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_profiles(&config.protocols)
    }
}

impl Predictor for StaticPredictor {
    fn name(&self) -> &'static str {
        "static"
    }

    fn predict_yields(&self) -> Result<ProtocolMap<f64>> {
        Ok(self.yields)
    }

    fn predict_risks(&self) -> Result<ProtocolMap<f64>> {
        Ok(self.risks)
    }
}
