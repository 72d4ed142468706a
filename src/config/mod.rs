//! Environment-driven coordinator configuration

pub mod contracts;

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::models::{Address, AddressError};

pub use contracts::ContractsConfig;

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_POOL_SIZE: usize = 20;
const DEFAULT_GAS_LIMIT: u64 = 1_300_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:8000";

/// Source of configuration values, keyed by variable name.
pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} is not a valid number: {value}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} contains an invalid address: {source}")]
    InvalidAddress {
        var: &'static str,
        source: AddressError,
    },
    #[error("ORACLE_POOL_SIZE must be greater than zero")]
    EmptyPool,
}

#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    pub rpc_url: String,
    pub contracts: ContractsConfig,
    /// Explicit candidate identities. `None` means ask the ledger for its accounts.
    pub oracle_candidates: Option<Vec<Address>>,
    pub pool_size: usize,
    pub registration_gas_limit: u64,
    pub event_poll_interval: Duration,
    pub dispatch_max_in_flight: usize,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl CoordinatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, ConfigError> {
        let pool_size = parse_or(lookup, "ORACLE_POOL_SIZE", DEFAULT_POOL_SIZE)?;
        if pool_size == 0 {
            return Err(ConfigError::EmptyPool);
        }

        let oracle_candidates = lookup("ORACLE_CANDIDATES")
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| parse_addresses("ORACLE_CANDIDATES", &raw))
            .transpose()?;

        Ok(Self {
            rpc_url: lookup("LEDGER_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            contracts: ContractsConfig::from_lookup(lookup)?,
            oracle_candidates,
            pool_size,
            registration_gas_limit: parse_or(lookup, "REGISTRATION_GAS_LIMIT", DEFAULT_GAS_LIMIT)?,
            event_poll_interval: Duration::from_millis(parse_or(
                lookup,
                "EVENT_POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )?),
            dispatch_max_in_flight: parse_or(lookup, "DISPATCH_MAX_IN_FLIGHT", pool_size)?,
            port: parse_or(lookup, "PORT", DEFAULT_PORT)?,
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }
}

fn parse_or<T: FromStr>(lookup: &Lookup<'_>, var: &'static str, default: T) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        None => Ok(default),
    }
}

fn parse_addresses(var: &'static str, raw: &str) -> Result<Vec<Address>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse()
                .map_err(|source| ConfigError::InvalidAddress { var, source })
        })
        .collect()
}
