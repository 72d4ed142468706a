//! Fan-out of status submissions across the oracle pool
//!
//! Every correlation event produces one submission attempt per registered
//! oracle, regardless of whether the oracle's indexes match the event. The
//! contract rejects mismatches; those rejections are logged and dropped.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::oracle_registry::OracleRegistry;
use crate::ledger::LedgerClient;
use crate::models::{
    Address, CorrelationEvent, FlightStatus, ResponseSubmission, SubmissionOutcome,
};

/// Aggregate of one fan-out round. For observability only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub round_id: Uuid,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

pub struct ResponseDispatcher {
    ledger: Arc<dyn LedgerClient>,
    registry: Arc<OracleRegistry>,
    permits: Arc<Semaphore>,
}

impl ResponseDispatcher {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        registry: Arc<OracleRegistry>,
        max_in_flight: usize,
    ) -> Self {
        Self {
            ledger,
            registry,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }

    /// Launch one submission per oracle and return immediately.
    ///
    /// The returned handle resolves once every attempt has finished; callers on
    /// the event path drop it.
    pub fn dispatch(&self, event: CorrelationEvent) -> JoinHandle<DispatchReport> {
        let round_id = Uuid::new_v4();
        let submission = ResponseSubmission {
            indexes: event.indexes,
            airline: event.airline,
            flight: event.flight,
            timestamp: event.timestamp,
            status_code: event
                .status_code
                .unwrap_or(FlightStatus::Unknown.code()),
        };

        info!(
            %round_id,
            index = event.index,
            flight = %submission.flight,
            status = FlightStatus::label(submission.status_code),
            oracles = self.registry.len(),
            "dispatching oracle responses"
        );

        let mut attempts = JoinSet::new();
        for address in self.registry.addresses() {
            attempts.spawn(submit(
                self.ledger.clone(),
                self.permits.clone(),
                address,
                submission.clone(),
            ));
        }

        tokio::spawn(collect(round_id, attempts))
    }
}

async fn submit(
    ledger: Arc<dyn LedgerClient>,
    permits: Arc<Semaphore>,
    address: Address,
    submission: ResponseSubmission,
) -> SubmissionOutcome {
    let _permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(err) => return SubmissionOutcome::failed(address, err),
    };

    match ledger.submit_response(address, &submission).await {
        Ok(_) => SubmissionOutcome::succeeded(address),
        Err(err) => SubmissionOutcome::failed(address, err),
    }
}

async fn collect(round_id: Uuid, mut attempts: JoinSet<SubmissionOutcome>) -> DispatchReport {
    let mut report = DispatchReport {
        round_id,
        attempted: attempts.len(),
        succeeded: 0,
        failed: 0,
    };

    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok(outcome) if outcome.success => {
                report.succeeded += 1;
                info!(%round_id, oracle = %outcome.oracle_address, "oracle response submitted");
            }
            Ok(outcome) => {
                report.failed += 1;
                warn!(
                    %round_id,
                    oracle = %outcome.oracle_address,
                    error = outcome.error.as_deref().unwrap_or("unknown"),
                    "Oracle didn't respond"
                );
            }
            Err(join_error) => {
                report.failed += 1;
                error!(%round_id, error = %join_error, "submission task aborted");
            }
        }
    }

    info!(
        %round_id,
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        "dispatch round complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::ledger::mock::{test_address, MockLedger};
    use crate::services::oracle_registrar::OracleRegistrar;

    async fn bootstrapped(pool: usize) -> (Arc<MockLedger>, Arc<OracleRegistry>) {
        let ledger = Arc::new(MockLedger::with_accounts(pool as u8 + 1));
        let registry = OracleRegistrar::new(ledger.clone(), pool, 1_300_000)
            .bootstrap(&ledger.accounts_list())
            .await
            .unwrap();
        (ledger, Arc::new(registry))
    }

    fn event(status_code: Option<u8>) -> CorrelationEvent {
        CorrelationEvent {
            index: 3,
            indexes: 3,
            airline: test_address(0xa1),
            flight: "XY123".to_string(),
            timestamp: 1_700_000_000,
            status_code,
        }
    }

    #[tokio::test]
    async fn every_oracle_submits_once() {
        let (ledger, registry) = bootstrapped(20).await;
        let dispatcher = ResponseDispatcher::new(ledger.clone(), registry.clone(), 20);

        let report = dispatcher.dispatch(event(Some(20))).await.unwrap();

        assert_eq!(report.attempted, 20);
        assert_eq!(report.succeeded, 20);
        let submissions = ledger.submissions();
        assert_eq!(submissions.len(), 20);

        let senders: HashSet<_> = submissions.iter().map(|(from, _)| *from).collect();
        let expected: HashSet<_> = registry.addresses().collect();
        assert_eq!(senders, expected);

        let (_, first) = &submissions[0];
        assert_eq!(first.indexes, 3);
        assert_eq!(first.flight, "XY123");
        assert_eq!(first.status_code, 20);
    }

    #[tokio::test]
    async fn one_failing_oracle_does_not_affect_others() {
        let (ledger, registry) = bootstrapped(5).await;
        ledger.fail_submission_for(test_address(2));
        let dispatcher = ResponseDispatcher::new(ledger.clone(), registry, 5);

        let report = dispatcher.dispatch(event(Some(10))).await.unwrap();

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(ledger.submissions().len(), 5);
    }

    #[tokio::test]
    async fn redelivery_runs_a_full_new_round() {
        let (ledger, registry) = bootstrapped(4).await;
        let dispatcher = ResponseDispatcher::new(ledger.clone(), registry, 4);

        let first = dispatcher.dispatch(event(Some(20))).await.unwrap();
        let second = dispatcher.dispatch(event(Some(20))).await.unwrap();

        assert_ne!(first.round_id, second.round_id);
        assert_eq!(ledger.submissions().len(), 8);
    }

    #[tokio::test]
    async fn bounded_in_flight_still_reaches_every_oracle() {
        let (ledger, registry) = bootstrapped(10).await;
        let dispatcher = ResponseDispatcher::new(ledger.clone(), registry, 2);

        let report = dispatcher.dispatch(event(None)).await.unwrap();

        assert_eq!(report.succeeded, 10);
        assert!(ledger
            .submissions()
            .iter()
            .all(|(_, s)| s.status_code == FlightStatus::Unknown.code()));
    }
}
