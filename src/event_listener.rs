//! Event listener for flight status contract events
//!
//! Three independent subscriptions feed one handler. Transport errors and
//! undecodable events are logged and skipped; nothing a subscription delivers
//! can stop it. Events may arrive out of order or more than once and are
//! handled the same way each time.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::ledger::{
    BlockTag, ContractEvent, EventKind, LedgerClient, Subscription, SubscriptionHandle,
};
use crate::models::{
    CorrelationEvent, FlightStatus, ReportFinalized, RequestIssued, ResponseSubmitted,
};
use crate::services::{DispatchReport, ResponseDispatcher};
use crate::state::CoordinatorState;

/// Starting block for each subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionPlan {
    pub request_issued: BlockTag,
    pub response_submitted: BlockTag,
    pub report_finalized: BlockTag,
}

impl SubscriptionPlan {
    pub fn start_for(&self, kind: EventKind) -> BlockTag {
        match kind {
            EventKind::RequestIssued => self.request_issued,
            EventKind::ResponseSubmitted => self.response_submitted,
            EventKind::ReportFinalized => self.report_finalized,
        }
    }
}

impl Default for SubscriptionPlan {
    /// Requests and reports replay from genesis; responses are live only.
    fn default() -> Self {
        Self {
            request_issued: BlockTag::Genesis,
            response_submitted: BlockTag::Latest,
            report_finalized: BlockTag::Genesis,
        }
    }
}

/// Running subscriptions and their consumer tasks.
pub struct ActiveSubscriptions {
    handles: Vec<SubscriptionHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl ActiveSubscriptions {
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every subscription and wait for the consumers to exit.
    pub async fn shutdown(self) {
        for handle in &self.handles {
            handle.cancel();
        }
        for task in self.tasks {
            if let Err(err) = task.await {
                warn!(error = %err, "event consumer ended abnormally");
            }
        }
        info!("event subscriptions stopped");
    }
}

#[derive(Clone)]
pub struct EventSubscriber {
    ledger: Arc<dyn LedgerClient>,
    state: Arc<CoordinatorState>,
    dispatcher: Arc<ResponseDispatcher>,
}

impl EventSubscriber {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        state: Arc<CoordinatorState>,
        dispatcher: Arc<ResponseDispatcher>,
    ) -> Self {
        Self {
            ledger,
            state,
            dispatcher,
        }
    }

    /// Open all three subscriptions and spawn a consumer for each.
    ///
    /// Ledger outages after this point surface as stream errors, so starting
    /// cannot fail.
    pub async fn start(&self, plan: SubscriptionPlan) -> ActiveSubscriptions {
        let mut subscriptions = Vec::with_capacity(EventKind::ALL.len());
        for kind in EventKind::ALL {
            subscriptions.push(self.ledger.subscribe(kind, plan.start_for(kind)).await);
        }

        let handles = subscriptions.iter().map(Subscription::handle).collect();
        let tasks = subscriptions
            .into_iter()
            .map(|subscription| tokio::spawn(self.clone().consume(subscription)))
            .collect();

        info!("event subscriptions active");
        ActiveSubscriptions { handles, tasks }
    }

    async fn consume(self, mut subscription: Subscription) {
        let kind = subscription.kind();
        while let Some(item) = subscription.next().await {
            match item {
                Ok(event) => {
                    self.handle_event(&event).await;
                }
                Err(err) => {
                    warn!(event = kind.contract_name(), error = %err, "subscription error");
                }
            }
        }
    }

    /// Apply one contract event. Returns the dispatch round it started, if any.
    pub async fn handle_event(&self, event: &ContractEvent) -> Option<JoinHandle<DispatchReport>> {
        match event.kind {
            EventKind::RequestIssued => {
                let request = self.decode::<RequestIssued>(event)?;
                self.state.record_request_index(request.index).await;
                info!(
                    index = request.index,
                    airline = %request.airline,
                    flight = %request.flight,
                    timestamp = request.timestamp,
                    block = event.block,
                    "oracle request observed"
                );
                None
            }
            EventKind::ResponseSubmitted => {
                let response = self.decode::<ResponseSubmitted>(event)?;
                info!(
                    index = response.index,
                    flight = %response.flight,
                    status = FlightStatus::label(response.status_code),
                    block = event.block,
                    "oracle response observed"
                );
                Some(self.dispatcher.dispatch(CorrelationEvent::from(response)))
            }
            EventKind::ReportFinalized => {
                let report = self.decode::<ReportFinalized>(event)?;
                info!(
                    airline = %report.airline,
                    flight = %report.flight,
                    timestamp = report.timestamp,
                    status = FlightStatus::label(report.status_code),
                    block = event.block,
                    "oracle report finalized"
                );
                None
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, event: &ContractEvent) -> Option<T> {
        match event.decode() {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(
                    event = event.kind.contract_name(),
                    block = event.block,
                    tx_hash = event.tx_hash.as_deref().unwrap_or("unknown"),
                    error = %err,
                    "dropping malformed event"
                );
                None
            }
        }
    }
}
