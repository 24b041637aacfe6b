//! # Yield Allocator
//! Turns per-protocol yield and risk estimates into a capital-allocation
//! vector in basis points, ready for an on-chain weight setter.
//!
//! The flow for one request:
//! predictor → [`allocation::AllocationEngine`] → [`allocation::encode_bps`],
//! with [`allocation::confidence`] computed alongside from the raw yields.
//! [`engine::AllocationService`] ties these together and [`server`] exposes
//! them over HTTP.

pub use crate::utils::error::{Error, Result};

pub mod allocation;
pub mod config;
pub mod engine;
pub mod market_data;
pub mod metrics;
pub mod predictor;
pub mod risk;
pub mod server;
pub mod utils;

pub use crate::allocation::{AllocationEngine, MIN_SHARE};
pub use crate::engine::{AllocationService, Recommendation};
pub use crate::utils::types::{AllocationVector, EncodedAllocation, ProtocolId, ProtocolMap};
