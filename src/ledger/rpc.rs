//! JSON-RPC gateway client for the flight status contract

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use super::{
    BlockTag, ContractEvent, EventKind, LedgerClient, LedgerError, Subscription,
    SubscriptionHandle, SubscriptionItem, TxHash,
};
use crate::models::{Address, OracleIndexes, ResponseSubmission};

/// Maximum number of blocks requested per poll cycle.
const MAX_BLOCK_RANGE: u64 = 200;

const SUBSCRIPTION_BUFFER: usize = 256;

/// Error code gateways use for a reverted call.
const EXECUTION_REVERTED: i64 = 3;

#[derive(Clone)]
pub struct RpcLedgerClient {
    rpc_url: String,
    contract: Address,
    poll_interval: Duration,
    http: Client,
}

impl RpcLedgerClient {
    pub fn new(rpc_url: impl Into<String>, contract: Address, poll_interval: Duration) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            contract,
            poll_interval,
            http: Client::new(),
        }
    }

    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let response = self
            .http
            .post(&self.rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": "flight-oracle-coordinator",
                "method": method,
                "params": params,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;

        if let Some(error) = response.get("error") {
            return Err(rpc_error(error));
        }

        response
            .get("result")
            .cloned()
            .ok_or_else(|| LedgerError::decode(method, "missing result in RPC response"))
    }

    async fn contract_call(
        &self,
        from: Option<Address>,
        function: &str,
        args: Value,
    ) -> Result<Value, LedgerError> {
        self.rpc_call(
            "contract_call",
            json!({
                "from": from,
                "to": self.contract,
                "function": function,
                "args": args,
            }),
        )
        .await
    }

    async fn contract_send(&self, tx: Value) -> Result<TxHash, LedgerError> {
        let result = self.rpc_call("contract_send", tx).await?;
        result
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| LedgerError::decode("transaction hash", "expected a string"))
    }

    async fn latest_block(&self) -> Result<u64, LedgerError> {
        let result = self.rpc_call("ledger_latestBlock", json!([])).await?;
        parse_quantity(&result)
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| LedgerError::decode("latest block", "expected an unsigned integer"))
    }

    async fn fetch_events(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<Value>, LedgerError> {
        let result = self
            .rpc_call(
                "contract_getEvents",
                json!({
                    "address": self.contract,
                    "event": kind.contract_name(),
                    "fromBlock": from_block,
                    "toBlock": to_block,
                }),
            )
            .await?;

        Ok(result.as_array().cloned().unwrap_or_default())
    }

    /// Poll loop backing one subscription. Exits on cancellation or when the
    /// consumer drops its receiver.
    ///
    /// A `None` cursor means "latest": it is pinned to the current block on the
    /// first successful poll, and each failed attempt is reported on the stream.
    async fn poll_events(
        self,
        kind: EventKind,
        mut cursor: Option<u64>,
        tx: mpsc::Sender<SubscriptionItem>,
        handle: SubscriptionHandle,
    ) {
        info!(event = kind.contract_name(), from_block = ?cursor, "event subscription started");

        loop {
            if handle.is_cancelled() {
                break;
            }
            if tx.is_closed() {
                debug!(event = kind.contract_name(), "subscriber dropped");
                return;
            }

            match self.poll_once(kind, cursor).await {
                Ok((events, next_cursor)) => {
                    for event in events {
                        if tx.send(event).await.is_err() {
                            debug!(event = kind.contract_name(), "subscriber dropped");
                            return;
                        }
                    }
                    cursor = Some(next_cursor);
                }
                Err(err) => {
                    warn!(event = kind.contract_name(), error = %err, "event poll failed");
                    if tx.send(Err(err)).await.is_err() {
                        return;
                    }
                }
            }

            tokio::select! {
                _ = handle.cancelled() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }

        info!(event = kind.contract_name(), "event subscription cancelled");
    }

    /// One poll cycle. Returns the decoded events and the cursor for the next
    /// cycle; the cursor is unchanged when the ledger has not moved past it.
    async fn poll_once(
        &self,
        kind: EventKind,
        cursor: Option<u64>,
    ) -> Result<(Vec<SubscriptionItem>, u64), LedgerError> {
        let latest = self.latest_block().await?;
        let from_block = cursor.unwrap_or(latest);
        if from_block > latest {
            return Ok((Vec::new(), from_block));
        }

        let to_block = latest.min(from_block + MAX_BLOCK_RANGE);
        let events = self
            .fetch_events(kind, from_block, to_block)
            .await?
            .into_iter()
            .map(|raw| parse_event(kind, raw))
            .collect();

        Ok((events, to_block + 1))
    }
}

#[async_trait]
impl LedgerClient for RpcLedgerClient {
    async fn accounts(&self) -> Result<Vec<Address>, LedgerError> {
        let result = self.rpc_call("ledger_accounts", json!([])).await?;
        serde_json::from_value(result).map_err(|err| LedgerError::decode("accounts", err))
    }

    async fn registration_fee(&self) -> Result<u128, LedgerError> {
        let result = self
            .contract_call(None, "REGISTRATION_FEE", json!([]))
            .await?;
        parse_quantity(&result)
            .ok_or_else(|| LedgerError::decode("registration fee", "expected an unsigned integer"))
    }

    async fn register_oracle(
        &self,
        from: Address,
        fee: u128,
        gas_limit: u64,
    ) -> Result<TxHash, LedgerError> {
        self.contract_send(json!({
            "from": from,
            "to": self.contract,
            "function": "registerOracle",
            "args": [],
            "value": fee.to_string(),
            "gas": gas_limit,
        }))
        .await
    }

    async fn assigned_indexes(&self, from: Address) -> Result<OracleIndexes, LedgerError> {
        let result = self
            .contract_call(Some(from), "getMyIndexes", json!([]))
            .await?;
        serde_json::from_value(result).map_err(|err| LedgerError::decode("assigned indexes", err))
    }

    async fn submit_response(
        &self,
        from: Address,
        submission: &ResponseSubmission,
    ) -> Result<TxHash, LedgerError> {
        self.contract_send(json!({
            "from": from,
            "to": self.contract,
            "function": "submitOracleResponse",
            "args": [
                submission.indexes,
                submission.airline,
                submission.flight,
                submission.timestamp,
                submission.status_code,
            ],
        }))
        .await
    }

    async fn subscribe(&self, kind: EventKind, from: BlockTag) -> Subscription {
        let cursor = match from {
            BlockTag::Genesis => Some(0),
            BlockTag::Latest => None,
            BlockTag::Number(n) => Some(n),
        };

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let handle = SubscriptionHandle::new();
        tokio::spawn(self.clone().poll_events(kind, cursor, tx, handle.clone()));

        Subscription::new(kind, rx, handle)
    }
}

fn rpc_error(error: &Value) -> LedgerError {
    let code = error.pointer("/code").and_then(Value::as_i64).unwrap_or(0);
    let message = error
        .pointer("/message")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();

    if code == EXECUTION_REVERTED || message.contains("revert") {
        LedgerError::Reverted(message)
    } else {
        LedgerError::Rpc { code, message }
    }
}

/// Quantities arrive as JSON numbers, decimal strings or `0x` hex strings.
fn parse_quantity(value: &Value) -> Option<u128> {
    match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => u128::from_str_radix(hex, 16).ok(),
            None => s.parse().ok(),
        },
        _ => None,
    }
}

fn parse_event(kind: EventKind, raw: Value) -> SubscriptionItem {
    let payload = raw
        .pointer("/returnValues")
        .or_else(|| raw.pointer("/data"))
        .cloned()
        .ok_or_else(|| LedgerError::decode(kind.contract_name(), "event has no return values"))?;

    let block = raw
        .pointer("/blockNumber")
        .and_then(parse_quantity)
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or(0);

    let tx_hash = raw
        .pointer("/transactionHash")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    Ok(ContractEvent {
        kind,
        block,
        tx_hash,
        payload,
    })
}
