//! Core domain types shared by the allocation pipeline.

use crate::utils::error::{Error, Result};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Tolerance used when checking that a weight vector sums to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Lending / liquidity protocols the service allocates across.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolId {
    Aave,
    Morpho,
    Spark,
    Uniswap,
}

impl ProtocolId {
    pub const COUNT: usize = 4;

    /// All protocols in canonical order. Index order matches `index()`.
    pub const ALL: [ProtocolId; ProtocolId::COUNT] =
        [ProtocolId::Aave, ProtocolId::Morpho, ProtocolId::Spark, ProtocolId::Uniswap];

    /// Display name ("Aave").
    pub fn name(self) -> &'static str {
        match self {
            | ProtocolId::Aave => "Aave",
            | ProtocolId::Morpho => "Morpho",
            | ProtocolId::Spark => "Spark",
            | ProtocolId::Uniswap => "Uniswap",
        }
    }

    /// Lower-case key used in on-chain weight payloads ("aave").
    pub fn key(self) -> &'static str {
        match self {
            | ProtocolId::Aave => "aave",
            | ProtocolId::Morpho => "morpho",
            | ProtocolId::Spark => "spark",
            | ProtocolId::Uniswap => "uniswap",
        }
    }

    /// Stable numeric encoding, also used as a model feature.
    pub fn index(self) -> usize {
        match self {
            | ProtocolId::Aave => 0,
            | ProtocolId::Morpho => 1,
            | ProtocolId::Spark => 2,
            | ProtocolId::Uniswap => 3,
        }
    }

    /// Comma separated list of valid names, for error messages.
    pub fn valid_names() -> String {
        ProtocolId::ALL.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolId {
    type Err = Error;

    /// Parses a protocol name after capitalizing it ("aAVE" -> "Aave").
    fn from_str(s: &str) -> Result<Self> {
        let normalized = capitalize(s.trim());
        ProtocolId::ALL
            .iter()
            .copied()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| Error::UnknownProtocol {
                given: s.to_string(),
                valid: ProtocolId::valid_names(),
            })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        | Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        | None => String::new(),
    }
}

impl Serialize for ProtocolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ProtocolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Total mapping from every protocol to a value.
///
/// Backed by a fixed array, so a missing or unknown protocol key cannot exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolMap<T> {
    values: [T; ProtocolId::COUNT],
}

impl<T> ProtocolMap<T> {
    pub fn from_fn<F: FnMut(ProtocolId) -> T>(mut f: F) -> Self {
        Self { values: ProtocolId::ALL.map(|p| f(p)) }
    }

    pub fn get(&self, protocol: ProtocolId) -> &T {
        &self.values[protocol.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProtocolId, &T)> + '_ {
        ProtocolId::ALL.iter().copied().zip(self.values.iter())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.values.iter()
    }

    pub fn map<U, F: FnMut(ProtocolId, &T) -> U>(&self, mut f: F) -> ProtocolMap<U> {
        ProtocolMap::from_fn(|p| f(p, self.get(p)))
    }

    pub fn len(&self) -> usize {
        ProtocolId::COUNT
    }

    pub fn is_empty(&self) -> bool {
        ProtocolId::COUNT == 0
    }
}

impl ProtocolMap<f64> {
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl<T: Clone> ProtocolMap<T> {
    pub fn splat(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T> Index<ProtocolId> for ProtocolMap<T> {
    type Output = T;

    fn index(&self, protocol: ProtocolId) -> &T {
        &self.values[protocol.index()]
    }
}

impl<T> IndexMut<ProtocolId> for ProtocolMap<T> {
    fn index_mut(&mut self, protocol: ProtocolId) -> &mut T {
        &mut self.values[protocol.index()]
    }
}

impl<T: Serialize> Serialize for ProtocolMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ProtocolId::COUNT))?;
        for (protocol, value) in self.iter() {
            map.serialize_entry(protocol.name(), value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ProtocolMap<T> {
    /// Accepts any key casing but requires every protocol exactly once.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = BTreeMap::<String, T>::deserialize(deserializer)?;
        let mut slots: [Option<T>; ProtocolId::COUNT] = [None, None, None, None];
        for (key, value) in raw {
            let protocol: ProtocolId = key.parse().map_err(serde::de::Error::custom)?;
            if slots[protocol.index()].replace(value).is_some() {
                return Err(serde::de::Error::custom(format!("duplicate protocol '{}'", key)));
            }
        }
        match slots {
            | [Some(aave), Some(morpho), Some(spark), Some(uniswap)] => {
                Ok(ProtocolMap { values: [aave, morpho, spark, uniswap] })
            }
            | slots => {
                let missing = ProtocolId::ALL
                    .iter()
                    .find(|p| slots[p.index()].is_none())
                    .map(|p| p.name())
                    .unwrap_or_default();
                Err(serde::de::Error::custom(format!("missing protocol '{}'", missing)))
            }
        }
    }
}

/// Yield and risk estimate for one protocol, produced per request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProtocolEstimate {
    pub protocol: ProtocolId,
    #[serde(rename = "yield")]
    pub yield_estimate: f64,
    /// Risk in [0, 1]; lower is better.
    pub risk: f64,
}

impl ProtocolEstimate {
    /// Builds an estimate, clamping risk into [0, 1].
    pub fn new(protocol: ProtocolId, yield_estimate: f64, risk: f64) -> Self {
        let risk = if risk.is_nan() { 1.0 } else { risk.clamp(0.0, 1.0) };
        Self { protocol, yield_estimate, risk }
    }

    /// Risk-adjusted score: `yield / (1 + risk)`.
    pub fn score(&self) -> f64 {
        self.yield_estimate / (1.0 + self.risk)
    }
}

/// Unit-interval weights per protocol, summing to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AllocationVector(ProtocolMap<f64>);

impl AllocationVector {
    /// Wraps weights after checking they are non-negative and sum to one.
    pub fn from_weights(weights: ProtocolMap<f64>) -> Result<Self> {
        if let Some((protocol, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w < 0.0) {
            return Err(Error::InvalidArgument(format!(
                "weight for {} must be a non-negative number, got {}",
                protocol, w
            )));
        }
        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::InvalidArgument(format!("weights must sum to 1.0, got {}", sum)));
        }
        Ok(Self(weights))
    }

    pub(crate) fn new_unchecked(weights: ProtocolMap<f64>) -> Self {
        Self(weights)
    }

    pub fn weight(&self, protocol: ProtocolId) -> f64 {
        self.0[protocol]
    }

    pub fn weights(&self) -> &ProtocolMap<f64> {
        &self.0
    }

    pub fn sum(&self) -> f64 {
        self.0.sum()
    }
}

/// Integer basis-point weights per protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedAllocation(ProtocolMap<u32>);

impl EncodedAllocation {
    pub(crate) fn new(bps: ProtocolMap<u32>) -> Self {
        Self(bps)
    }

    pub fn bps(&self, protocol: ProtocolId) -> u32 {
        self.0[protocol]
    }

    pub fn as_map(&self) -> &ProtocolMap<u32> {
        &self.0
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }
}

impl Serialize for EncodedAllocation {
    /// Serialized with lower-case keys, matching the on-chain weight setter.
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(ProtocolId::COUNT))?;
        for (protocol, bps) in self.0.iter() {
            map.serialize_entry(protocol.key(), bps)?;
        }
        map.end()
    }
}
