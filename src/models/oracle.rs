use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};

use super::quantity::{self, Quantity};
use super::Address;

/// The three request indexes the contract assigned to an oracle at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OracleIndexes(pub [u8; 3]);

impl<'de> Deserialize<'de> for OracleIndexes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = Vec::<Quantity>::deserialize(deserializer)?
            .into_iter()
            .map(Quantity::into_value::<u8, D::Error>)
            .collect::<Result<Vec<u8>, _>>()?;

        let indexes: [u8; 3] = values
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::invalid_length(v.len(), &"exactly three indexes"))?;
        Ok(Self(indexes))
    }
}

/// A simulated reporting node registered with the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oracle {
    pub address: Address,
    pub indexes: OracleIndexes,
}

/// `RequestIssued` contract event: a new status query is pending.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestIssued {
    #[serde(deserialize_with = "quantity::deserialize")]
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub timestamp: u64,
}

/// `ResponseSubmitted` contract event: some oracle voted on a pending query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSubmitted {
    #[serde(deserialize_with = "quantity::deserialize")]
    pub index: u8,
    pub airline: Address,
    pub flight: String,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub timestamp: u64,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub status_code: u8,
    /// Request index echoed back by the contract; forwarded verbatim on re-dispatch.
    #[serde(deserialize_with = "quantity::deserialize")]
    pub indexes: u8,
}

/// `ReportFinalized` contract event. Observed and logged only.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFinalized {
    pub airline: Address,
    pub flight: String,
    #[serde(deserialize_with = "quantity::deserialize")]
    pub timestamp: u64,
    /// Emitted as `status` by the contract ABI.
    #[serde(alias = "status", deserialize_with = "quantity::deserialize")]
    pub status_code: u8,
}

/// A query the contract wants the oracle pool to answer.
///
/// Built from a contract event and consumed immediately by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationEvent {
    pub index: u8,
    pub indexes: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
    pub status_code: Option<u8>,
}

impl From<ResponseSubmitted> for CorrelationEvent {
    fn from(event: ResponseSubmitted) -> Self {
        Self {
            index: event.index,
            indexes: event.indexes,
            airline: event.airline,
            flight: event.flight,
            timestamp: event.timestamp,
            status_code: Some(event.status_code),
        }
    }
}

/// Arguments of one `submitResponse` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseSubmission {
    pub indexes: u8,
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
    pub status_code: u8,
}

/// Result of a single oracle's submission attempt. Logged, never retained.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub oracle_address: Address,
    pub success: bool,
    pub error: Option<String>,
}

impl SubmissionOutcome {
    pub fn succeeded(oracle_address: Address) -> Self {
        Self {
            oracle_address,
            success: true,
            error: None,
        }
    }

    pub fn failed(oracle_address: Address, error: impl ToString) -> Self {
        Self {
            oracle_address,
            success: false,
            error: Some(error.to_string()),
        }
    }
}
