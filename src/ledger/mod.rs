//! Ledger access for the coordinator
//!
//! [`LedgerClient`] is the only path to the authoritative contract. It covers
//! the four contract entrypoints the oracle pool needs plus a polling-backed
//! event subscription. The JSON-RPC implementation lives in [`rpc`].

pub mod rpc;

#[cfg(test)]
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

use crate::models::{Address, OracleIndexes, ResponseSubmission};

pub use rpc::RpcLedgerClient;

/// Transaction hash returned by the gateway for a state-changing call.
pub type TxHash = String;

/// Errors surfaced by a ledger call or an event subscription.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("transaction reverted: {0}")]
    Reverted(String),
    #[error("failed to decode {what}: {reason}")]
    Decode { what: String, reason: String },
}

impl LedgerError {
    pub fn decode(what: impl Into<String>, reason: impl ToString) -> Self {
        LedgerError::Decode {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for LedgerError {
    fn from(err: reqwest::Error) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

/// Contract events the coordinator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestIssued,
    ResponseSubmitted,
    ReportFinalized,
}

impl EventKind {
    pub const ALL: [EventKind; 3] = [
        EventKind::RequestIssued,
        EventKind::ResponseSubmitted,
        EventKind::ReportFinalized,
    ];

    /// Event name as declared in the contract ABI.
    pub fn contract_name(self) -> &'static str {
        match self {
            EventKind::RequestIssued => "OracleRequest",
            EventKind::ResponseSubmitted => "SubmitOracleResponse",
            EventKind::ReportFinalized => "OracleReport",
        }
    }
}

/// Block a subscription starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Genesis,
    Latest,
    Number(u64),
}

/// A raw contract event as delivered by the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEvent {
    pub kind: EventKind,
    pub block: u64,
    pub tx_hash: Option<String>,
    pub payload: Value,
}

impl ContractEvent {
    /// Decode the event's return values into a typed payload.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, LedgerError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|err| LedgerError::decode(self.kind.contract_name(), err))
    }
}

/// Cancels the producer side of a [`Subscription`]. Cloneable; any clone cancels.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    cancel: Arc<watch::Sender<bool>>,
}

impl SubscriptionHandle {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            cancel: Arc::new(cancel),
        }
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Item yielded by a subscription: an event, or a transport-level failure.
pub type SubscriptionItem = Result<ContractEvent, LedgerError>;

/// A live, unbounded stream of one kind of contract event.
#[derive(Debug)]
pub struct Subscription {
    kind: EventKind,
    events: mpsc::Receiver<SubscriptionItem>,
    handle: SubscriptionHandle,
}

impl Subscription {
    pub fn new(
        kind: EventKind,
        events: mpsc::Receiver<SubscriptionItem>,
        handle: SubscriptionHandle,
    ) -> Self {
        Self {
            kind,
            events,
            handle,
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Next item, or `None` once the producer has stopped.
    pub async fn next(&mut self) -> Option<SubscriptionItem> {
        if self.handle.is_cancelled() {
            return None;
        }
        tokio::select! {
            item = self.events.recv() => item,
            _ = self.handle.cancelled() => None,
        }
    }
}

/// Calls, submissions and subscriptions against the coordinator's contract.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Identities managed by the connected node.
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError>;

    /// Current oracle registration fee.
    async fn registration_fee(&self) -> Result<u128, LedgerError>;

    /// Register `from` as an oracle, paying `fee`.
    async fn register_oracle(
        &self,
        from: Address,
        fee: u128,
        gas_limit: u64,
    ) -> Result<TxHash, LedgerError>;

    /// Indexes the contract assigned to `from`. Reverts if `from` is not registered.
    async fn assigned_indexes(&self, from: Address) -> Result<OracleIndexes, LedgerError>;

    /// Submit a status vote from `from`.
    async fn submit_response(
        &self,
        from: Address,
        submission: &ResponseSubmission,
    ) -> Result<TxHash, LedgerError>;

    /// Open a subscription to `kind` events starting at `from`.
    ///
    /// Opening never fails. Transport errors, including failing to resolve
    /// [`BlockTag::Latest`], are delivered as `Err` items on the stream.
    async fn subscribe(&self, kind: EventKind, from: BlockTag) -> Subscription;
}
