//! Portfolio-level risk classification.
//! Averages the per-protocol risk scores and maps the result onto a coarse
//! low / medium / high level with a short recommendation for the caller.

use crate::utils::types::ProtocolMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Average risk below this is "low".
pub const LOW_RISK_THRESHOLD: f64 = 0.3;
/// Average risk below this (and not low) is "medium".
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.5;

/// Overall portfolio risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Classify an average risk score.
    pub fn classify(average_risk: f64) -> Self {
        if average_risk < LOW_RISK_THRESHOLD {
            RiskLevel::Low
        } else if average_risk < MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Human-readable advice for this level.
    pub fn recommendation(self) -> &'static str {
        match self {
            | RiskLevel::Low => {
                "Portfolio risk is low. Consider increasing allocation to higher-yield protocols."
            }
            | RiskLevel::Medium => "Portfolio risk is moderate. Current allocation is balanced.",
            | RiskLevel::High => {
                "Portfolio risk is high. Consider diversifying to lower-risk protocols."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            | RiskLevel::Low => "low",
            | RiskLevel::Medium => "medium",
            | RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unweighted mean of the risk scores.
pub fn average_risk(risks: &ProtocolMap<f64>) -> f64 {
    risks.sum() / risks.len() as f64
}
