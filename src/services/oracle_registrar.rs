//! One-time oracle pool bootstrap
//!
//! The pipeline is: fee query, then concurrent `register -> getIndexes` for
//! every selected candidate, then freeze. The first failing stage for any
//! candidate rejects the whole bootstrap; nothing is retried and no partial
//! registry escapes.

use std::sync::Arc;

use futures_util::future::try_join_all;
use thiserror::Error;
use tracing::{error, info};

use super::oracle_registry::{OracleRegistry, OracleRegistryBuilder};
use crate::ledger::{LedgerClient, LedgerError};
use crate::models::{Address, Oracle};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("failed to query registration fee: {0}")]
    FeeQuery(LedgerError),
    #[error("failed to list candidate accounts: {0}")]
    Candidates(LedgerError),
    #[error("registration of {address} failed: {source}")]
    Registration {
        address: Address,
        source: LedgerError,
    },
    #[error("index query for {address} failed: {source}")]
    IndexQuery {
        address: Address,
        source: LedgerError,
    },
    #[error("need {required} candidates after the reserved account, found {available}")]
    InsufficientCandidates { required: usize, available: usize },
    #[error("oracle {0} registered twice")]
    DuplicateOracle(Address),
    #[error("expected {expected} oracles, registered {actual}")]
    PoolSizeMismatch { expected: usize, actual: usize },
}

pub struct OracleRegistrar {
    ledger: Arc<dyn LedgerClient>,
    pool_size: usize,
    gas_limit: u64,
}

impl OracleRegistrar {
    pub fn new(ledger: Arc<dyn LedgerClient>, pool_size: usize, gas_limit: u64) -> Self {
        Self {
            ledger,
            pool_size,
            gas_limit,
        }
    }

    /// Candidate identities: the configured list if present, otherwise the
    /// accounts managed by the connected node.
    pub async fn resolve_candidates(
        &self,
        configured: Option<Vec<Address>>,
    ) -> Result<Vec<Address>, BootstrapError> {
        match configured {
            Some(candidates) => Ok(candidates),
            None => self
                .ledger
                .accounts()
                .await
                .map_err(BootstrapError::Candidates),
        }
    }

    /// Register `pool_size` oracles drawn from `candidates[1..]`.
    pub async fn bootstrap(&self, candidates: &[Address]) -> Result<OracleRegistry, BootstrapError> {
        let result = self.run(candidates).await;
        match &result {
            Ok(registry) => info!(oracles = registry.len(), "All oracles registered"),
            Err(err) => error!(error = %err, "oracle bootstrap failed"),
        }
        result
    }

    async fn run(&self, candidates: &[Address]) -> Result<OracleRegistry, BootstrapError> {
        let selected = self.select(candidates)?;

        let fee = self
            .ledger
            .registration_fee()
            .await
            .map_err(BootstrapError::FeeQuery)?;
        info!(fee = %fee, candidates = selected.len(), "registering oracles");

        let oracles = try_join_all(selected.iter().map(|&address| self.register_one(address, fee))).await?;

        let mut builder = OracleRegistryBuilder::new();
        for oracle in oracles {
            builder.insert(oracle)?;
        }
        builder.finish(self.pool_size)
    }

    fn select<'a>(&self, candidates: &'a [Address]) -> Result<&'a [Address], BootstrapError> {
        // The first candidate is the contract owner and never acts as an oracle.
        let eligible = candidates.get(1..).unwrap_or_default();
        if eligible.len() < self.pool_size {
            return Err(BootstrapError::InsufficientCandidates {
                required: self.pool_size,
                available: eligible.len(),
            });
        }
        Ok(&eligible[..self.pool_size])
    }

    async fn register_one(&self, address: Address, fee: u128) -> Result<Oracle, BootstrapError> {
        self.ledger
            .register_oracle(address, fee, self.gas_limit)
            .await
            .map_err(|source| BootstrapError::Registration { address, source })?;

        let indexes = self
            .ledger
            .assigned_indexes(address)
            .await
            .map_err(|source| BootstrapError::IndexQuery { address, source })?;

        let [a, b, c] = indexes.0;
        info!(%address, "Oracle Registered: {}, {}, {}", a, b, c);

        Ok(Oracle { address, indexes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::{test_address, MockLedger};

    const GAS: u64 = 1_300_000;

    fn registrar(ledger: &Arc<MockLedger>, pool_size: usize) -> OracleRegistrar {
        OracleRegistrar::new(ledger.clone(), pool_size, GAS)
    }

    #[tokio::test]
    async fn registers_exactly_the_pool_size() {
        let ledger = Arc::new(MockLedger::with_accounts(25));
        let registry = registrar(&ledger, 20)
            .bootstrap(&ledger.accounts_list())
            .await
            .unwrap();

        assert_eq!(registry.len(), 20);
        assert!(registry.get(&test_address(0)).is_none());
        assert!(registry.get(&test_address(21)).is_none());
        for n in 1..=20 {
            assert!(registry.get(&test_address(n)).is_some());
        }

        let calls = ledger.registration_calls();
        assert_eq!(calls.len(), 20);
        assert!(calls.iter().all(|&(_, fee, gas)| fee == ledger.fee() && gas == GAS));
    }

    #[tokio::test]
    async fn single_registration_failure_rejects_bootstrap() {
        let ledger = Arc::new(MockLedger::with_accounts(21));
        ledger.fail_registration_for(test_address(7));

        let err = registrar(&ledger, 20)
            .bootstrap(&ledger.accounts_list())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::Registration { address, .. } if address == test_address(7)
        ));
    }

    #[tokio::test]
    async fn index_query_failure_rejects_bootstrap() {
        let ledger = Arc::new(MockLedger::with_accounts(6));
        ledger.fail_indexes_for(test_address(2));

        let err = registrar(&ledger, 5)
            .bootstrap(&ledger.accounts_list())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::IndexQuery { .. }));
    }

    #[tokio::test]
    async fn fee_failure_stops_before_any_registration() {
        let ledger = Arc::new(MockLedger::with_accounts(6));
        ledger.fail_fee_query();

        let err = registrar(&ledger, 5)
            .bootstrap(&ledger.accounts_list())
            .await
            .unwrap_err();

        assert!(matches!(err, BootstrapError::FeeQuery(_)));
        assert!(ledger.registration_calls().is_empty());
    }

    #[tokio::test]
    async fn too_few_candidates_is_rejected_up_front() {
        let ledger = Arc::new(MockLedger::with_accounts(20));

        let err = registrar(&ledger, 20)
            .bootstrap(&ledger.accounts_list())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BootstrapError::InsufficientCandidates {
                required: 20,
                available: 19
            }
        );
        assert!(ledger.registration_calls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_candidates_are_rejected() {
        let ledger = Arc::new(MockLedger::with_accounts(4));
        let candidates = vec![test_address(0), test_address(1), test_address(1)];

        let err = registrar(&ledger, 2).bootstrap(&candidates).await.unwrap_err();

        // The second registration reverts as already registered.
        assert!(matches!(err, BootstrapError::Registration { .. }));
    }

    #[tokio::test]
    async fn candidates_fall_back_to_ledger_accounts() {
        let ledger = Arc::new(MockLedger::with_accounts(3));
        let registrar = registrar(&ledger, 2);

        assert_eq!(
            registrar.resolve_candidates(None).await.unwrap(),
            ledger.accounts_list()
        );
        assert_eq!(
            registrar
                .resolve_candidates(Some(vec![test_address(9)]))
                .await
                .unwrap(),
            vec![test_address(9)]
        );
    }
}
