//! Data models for the oracle coordinator

pub mod flight;
pub mod oracle;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use flight::{FlightStatus, ReferenceFlight};
pub use oracle::{
    CorrelationEvent, Oracle, OracleIndexes, ReportFinalized, RequestIssued, ResponseSubmission,
    ResponseSubmitted, SubmissionOutcome,
};

/// Errors produced when parsing a ledger identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be 20 bytes, got {0}")]
    InvalidLength(usize),
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
}

/// A 20-byte ledger identity, rendered as lowercase `0x`-prefixed hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let body = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| AddressError::MissingPrefix(s.to_string()))?;

        let bytes = hex::decode(body).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| AddressError::InvalidLength(v.len()))?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Contract integers arrive either as JSON numbers or as decimal strings.
pub(crate) mod quantity {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(crate) enum Quantity {
        Number(u64),
        Text(String),
    }

    impl Quantity {
        pub(crate) fn into_value<T: TryFrom<u64>, E: Error>(self) -> Result<T, E> {
            let n = match self {
                Quantity::Number(n) => n,
                Quantity::Text(s) => s.trim().parse().map_err(E::custom)?,
            };
            T::try_from(n).map_err(|_| E::custom(format!("{n} is out of range")))
        }
    }

    pub(crate) fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        Quantity::deserialize(deserializer)?.into_value()
    }
}

/// Envelope used by every query endpoint that returns coordinator data.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct QueryResult<T> {
    pub result: T,
}
