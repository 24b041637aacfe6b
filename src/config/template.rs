//! Configuration template generation

use crate::config::Config;
use crate::utils::error::Result;
use std::fs;
use std::path::Path;

/// Generate a default configuration file at the specified path
pub fn generate_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    Config::default().save(path)
}

/// Generate a configuration file with comments explaining each field
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> Result<()> {
    let toml_str = r#"# Yield Allocator Configuration
# This is a template configuration file with all available options.
# Uncomment and modify the values as needed.

version = "0.1.0"

[app]
# Log level (trace, debug, info, warn, error).
# YIELD_ALLOCATOR_LOG overrides this with a full env_logger filter.
log_level = "info"

[server]
# Interface and port for the HTTP API
host = "0.0.0.0"
port = 8000

# Bind an ephemeral port when the configured one is taken
fallback_to_random_port = false

[allocation]
# Minimum share every protocol receives (0.05 = 5%).
# Must satisfy min_share * 4 <= 1.
min_share = 0.05

# Confidence = clamp(1 - variance(yields) * confidence_scale, 0, 1)
confidence_scale = 100.0

[predictor]
# Fitted model file (JSON). When missing, the static table below is used.
model_path = "models/predictors.json"

# Market condition feature for the yield model (0-1)
market_condition = 0.7

[history]
# Length of /historical series when `days` is not given
default_days = 30

# Longest series a caller may request
max_days = 3650

# Linear trend added per day of age, and daily noise
trend_per_day = 0.0001
noise_std = 0.005

# Reference profile per protocol. base_apy and risk_score double as the
# static fallback predictions.
[protocols.Aave]
base_apy = 0.072
tvl = 5000000.0
volatility = 0.15
risk_score = 0.30

[protocols.Morpho]
base_apy = 0.068
tvl = 3000000.0
volatility = 0.12
risk_score = 0.25

[protocols.Spark]
base_apy = 0.070
tvl = 2000000.0
volatility = 0.18
risk_score = 0.35

[protocols.Uniswap]
base_apy = 0.065
tvl = 4000000.0
volatility = 0.20
risk_score = 0.40
"#;

    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml_str)?;
    Ok(())
}
