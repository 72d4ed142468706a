//! In-memory ledger used by unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{
    BlockTag, ContractEvent, EventKind, LedgerClient, LedgerError, Subscription,
    SubscriptionHandle, SubscriptionItem, TxHash,
};
use crate::models::{Address, OracleIndexes, ResponseSubmission};

pub fn test_address(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xaa;
    bytes[19] = n;
    Address::from_bytes(bytes)
}

#[derive(Default)]
struct MockState {
    fee_unavailable: bool,
    registered: HashMap<Address, OracleIndexes>,
    registration_calls: Vec<(Address, u128, u64)>,
    fail_registration: HashSet<Address>,
    fail_indexes: HashSet<Address>,
    fail_submission: HashSet<Address>,
    submissions: Vec<(Address, ResponseSubmission)>,
    subscriptions: Vec<(EventKind, BlockTag)>,
    senders: HashMap<EventKind, Vec<mpsc::UnboundedSender<SubscriptionItem>>>,
    next_block: u64,
}

/// Scriptable [`LedgerClient`]: assigns deterministic indexes, records every
/// call and lets tests inject failures and events.
pub struct MockLedger {
    fee: u128,
    accounts: Vec<Address>,
    state: Mutex<MockState>,
}

impl MockLedger {
    /// Ledger with `count` accounts, `test_address(0)..test_address(count - 1)`.
    pub fn with_accounts(count: u8) -> Self {
        Self {
            fee: 1_000_000_000_000_000_000,
            accounts: (0..count).map(test_address).collect(),
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn fee(&self) -> u128 {
        self.fee
    }

    pub fn accounts_list(&self) -> Vec<Address> {
        self.accounts.clone()
    }

    pub fn fail_fee_query(&self) {
        self.state.lock().unwrap().fee_unavailable = true;
    }

    pub fn fail_registration_for(&self, address: Address) {
        self.state.lock().unwrap().fail_registration.insert(address);
    }

    pub fn fail_indexes_for(&self, address: Address) {
        self.state.lock().unwrap().fail_indexes.insert(address);
    }

    pub fn fail_submission_for(&self, address: Address) {
        self.state.lock().unwrap().fail_submission.insert(address);
    }

    pub fn registration_calls(&self) -> Vec<(Address, u128, u64)> {
        self.state.lock().unwrap().registration_calls.clone()
    }

    pub fn submissions(&self) -> Vec<(Address, ResponseSubmission)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn subscriptions(&self) -> Vec<(EventKind, BlockTag)> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    /// Deliver an event to every open subscription of `kind`.
    pub fn emit(&self, kind: EventKind, payload: Value) {
        let mut state = self.state.lock().unwrap();
        state.next_block += 1;
        let event = ContractEvent {
            kind,
            block: state.next_block,
            tx_hash: Some(format!("0x{:064x}", state.next_block)),
            payload,
        };
        Self::deliver(&mut state, kind, Ok(event));
    }

    /// Deliver a transport failure to every open subscription of `kind`.
    pub fn emit_error(&self, kind: EventKind, error: LedgerError) {
        let mut state = self.state.lock().unwrap();
        Self::deliver(&mut state, kind, Err(error));
    }

    fn deliver(state: &mut MockState, kind: EventKind, item: SubscriptionItem) {
        if let Some(senders) = state.senders.get_mut(&kind) {
            senders.retain(|tx| tx.send(item.clone()).is_ok());
        }
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        Ok(self.accounts.clone())
    }

    async fn registration_fee(&self) -> Result<u128, LedgerError> {
        tokio::task::yield_now().await;
        if self.state.lock().unwrap().fee_unavailable {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        Ok(self.fee)
    }

    async fn register_oracle(
        &self,
        from: Address,
        fee: u128,
        gas_limit: u64,
    ) -> Result<TxHash, LedgerError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.registration_calls.push((from, fee, gas_limit));

        if state.fail_registration.contains(&from) {
            return Err(LedgerError::Reverted("insufficient funds".into()));
        }
        if fee < self.fee {
            return Err(LedgerError::Reverted("Registration fee is required".into()));
        }
        if state.registered.contains_key(&from) {
            return Err(LedgerError::Reverted("Oracle already registered".into()));
        }

        let seed = state.registered.len() as u8;
        let indexes = OracleIndexes([seed % 10, (seed + 3) % 10, (seed + 7) % 10]);
        state.registered.insert(from, indexes);
        Ok(format!("0xreg{}", from))
    }

    async fn assigned_indexes(&self, from: Address) -> Result<OracleIndexes, LedgerError> {
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        if state.fail_indexes.contains(&from) {
            return Err(LedgerError::Transport("timeout".into()));
        }
        state
            .registered
            .get(&from)
            .copied()
            .ok_or_else(|| LedgerError::Reverted("Not registered as an oracle".into()))
    }

    async fn submit_response(
        &self,
        from: Address,
        submission: &ResponseSubmission,
    ) -> Result<TxHash, LedgerError> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        state.submissions.push((from, submission.clone()));

        if state.fail_submission.contains(&from) {
            return Err(LedgerError::Reverted(
                "Index does not match oracle request".into(),
            ));
        }
        Ok(format!("0xsub{}", from))
    }

    async fn subscribe(&self, kind: EventKind, from: BlockTag) -> Subscription {
        let (tx, mut unbounded_rx) = mpsc::unbounded_channel();
        {
            let mut state = self.state.lock().unwrap();
            state.subscriptions.push((kind, from));
            state.senders.entry(kind).or_default().push(tx);
        }

        // Bridge into the bounded channel `Subscription` expects.
        let (bounded_tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            while let Some(item) = unbounded_rx.recv().await {
                if bounded_tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        Subscription::new(kind, rx, SubscriptionHandle::new())
    }
}
