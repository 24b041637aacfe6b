//! Error handling for the allocation service.

use thiserror::Error;

/// Main error type for the allocation service
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid argument errors (bad query values, empty inputs)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Protocol name outside the supported set
    #[error("Invalid protocol '{given}'. Must be one of: {valid}")]
    UnknownProtocol { given: String, valid: String },

    /// The diversification floor cannot be honoured for every protocol
    #[error("Minimum share {min_share} is infeasible for {protocols} protocols")]
    InfeasibleFloor { min_share: f64, protocols: usize },

    /// Predictor failures (malformed model files, feature mismatches)
    #[error("Predictor error: {0}")]
    PredictorError(String),

    /// Data-related errors (e.g. missing or malformed market data)
    #[error("Data error: {0}")]
    DataError(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    /// Other errors
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Whether the error was caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::UnknownProtocol { .. })
    }
}

/// Result type for the allocation service
pub type Result<T> = std::result::Result<T, Error>;

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}
