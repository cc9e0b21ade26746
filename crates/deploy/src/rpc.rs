//! Shared RPC utilities for interacting with Ethereum JSON-RPC endpoints.

use std::time::Duration;

use alloy_core::primitives::{Address, B256, U64, U256};
use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;

/// Default timeout for RPC requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Create an HTTP client configured for JSON-RPC requests.
pub fn create_client() -> Result<reqwest::Client, anyhow::Error> {
    reqwest::Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the result.
///
/// # Arguments
/// * `client` - The HTTP client to use
/// * `url` - The RPC endpoint URL
/// * `method` - The RPC method name
/// * `params` - The method parameters
///
/// # Returns
/// The deserialized result, or an error if the request failed or returned an error response.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> Result<T, anyhow::Error> {
    let response = client
        .post(url)
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error from {}: {}",
            method,
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// The subset of a transaction receipt this crate reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    pub block_number: Option<U64>,
    #[serde(default)]
    pub contract_address: Option<Address>,
    /// `0x1` on success, `0x0` on revert. Absent on pre-Byzantium chains.
    #[serde(default)]
    pub status: Option<U64>,
    pub gas_used: U256,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.map(|s| s == U64::from(1)).unwrap_or(true)
    }
}

/// Outcome of a single receipt poll.
#[derive(Debug)]
enum PollError {
    /// The node does not know a receipt yet.
    Pending,
    Rpc(anyhow::Error),
}

/// Poll `eth_getTransactionReceipt` every `interval` until a receipt shows up.
///
/// Gives up after `max_polls` empty polls. Only the read is repeated; the
/// transaction itself is never re-sent.
pub async fn wait_for_receipt(
    client: &reqwest::Client,
    url: &str,
    tx_hash: B256,
    interval: Duration,
    max_polls: usize,
) -> Result<TransactionReceipt, anyhow::Error> {
    let poll = move || async move {
        let receipt: Option<TransactionReceipt> = json_rpc_call(
            client,
            url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await
        .map_err(PollError::Rpc)?;

        receipt.ok_or(PollError::Pending)
    };

    let result = poll
        .retry(
            ConstantBuilder::default()
                .with_delay(interval)
                .with_max_times(max_polls),
        )
        .when(|e| matches!(e, PollError::Pending))
        .notify(|_, after| {
            tracing::trace!(tx_hash = %tx_hash, ?after, "Receipt not available yet, polling again...");
        })
        .await;

    match result {
        Ok(receipt) => Ok(receipt),
        Err(PollError::Pending) => {
            tracing::warn!(
                tx_hash = %tx_hash,
                "No receipt before the confirmation timeout, the transaction may still be mined"
            );
            anyhow::bail!(
                "Timed out waiting for receipt of {} after {} polls",
                tx_hash,
                max_polls
            )
        }
        Err(PollError::Rpc(e)) => Err(e.context(format!("Failed to fetch receipt of {}", tx_hash))),
    }
}
