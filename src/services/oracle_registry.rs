//! The bootstrapped oracle pool
//!
//! Populated once through [`OracleRegistryBuilder`] during bootstrap, then
//! frozen into an immutable [`OracleRegistry`] shared behind an `Arc`.

use std::collections::BTreeMap;

use super::oracle_registrar::BootstrapError;
use crate::models::{Address, Oracle, OracleIndexes};

/// Append-only collection used while registrations are in flight.
#[derive(Debug, Default)]
pub struct OracleRegistryBuilder {
    oracles: BTreeMap<Address, OracleIndexes>,
}

impl OracleRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, oracle: Oracle) -> Result<(), BootstrapError> {
        if self.oracles.contains_key(&oracle.address) {
            return Err(BootstrapError::DuplicateOracle(oracle.address));
        }
        self.oracles.insert(oracle.address, oracle.indexes);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    /// Freeze the pool. Fails unless exactly `expected` oracles were added.
    pub fn finish(self, expected: usize) -> Result<OracleRegistry, BootstrapError> {
        if self.oracles.len() != expected {
            return Err(BootstrapError::PoolSizeMismatch {
                expected,
                actual: self.oracles.len(),
            });
        }

        Ok(OracleRegistry {
            oracles: self
                .oracles
                .into_iter()
                .map(|(address, indexes)| Oracle { address, indexes })
                .collect(),
        })
    }
}

/// Read-only oracle pool, ordered by address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleRegistry {
    oracles: Vec<Oracle>,
}

impl OracleRegistry {
    pub fn len(&self) -> usize {
        self.oracles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.oracles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Oracle> {
        self.oracles.iter()
    }

    pub fn get(&self, address: &Address) -> Option<&Oracle> {
        self.oracles
            .binary_search_by(|oracle| oracle.address.cmp(address))
            .ok()
            .map(|pos| &self.oracles[pos])
    }

    pub fn addresses(&self) -> impl Iterator<Item = Address> + '_ {
        self.oracles.iter().map(|oracle| oracle.address)
    }
}
