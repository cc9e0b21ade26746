//! JSON-RPC implementation of the contract factory.

use std::sync::Arc;

use alloy_consensus::TxLegacy;
use alloy_core::primitives::{Address, B256, Bytes, TxKind, U64, U256, b256};
use anyhow::{Context, Result};
use serde_json::json;
use url::Url;

use crate::{
    artifacts::{Artifact, ArtifactStore},
    config::ConfirmationConfig,
    error::ConfigurationError,
    network::{DeploymentTarget, GasPolicy},
    plan::{ArgValue, ContractDeploymentSpec, DeploymentKind, TxConfirmation},
    rpc::{self, TransactionReceipt},
    traits::{ConfirmedDeployment, ContractFactory, DeployableHandle, PendingDeployment},
    tx::Wallet,
};

/// EIP-1967 admin slot: `bytes32(uint256(keccak256("eip1967.proxy.admin")) - 1)`.
pub const EIP1967_ADMIN_SLOT: B256 =
    b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// A signing connection to one node.
#[derive(Debug)]
pub struct ChainClient {
    http: reqwest::Client,
    url: Url,
    wallet: Wallet,
    chain_id: u64,
    gas: GasPolicy,
    confirmation: ConfirmationConfig,
}

impl ChainClient {
    /// Connect to the target's node and check that it serves the expected chain.
    ///
    /// Targets without a configured chain id adopt the node's.
    pub async fn connect(target: &DeploymentTarget, confirmation: ConfirmationConfig) -> Result<Self> {
        let wallet = Wallet::from_credential(&target.signing_credential, target.credential)?;
        let http = rpc::create_client()?;

        let reported: U64 = rpc::json_rpc_call(&http, target.rpc_url.as_str(), "eth_chainId", vec![])
            .await
            .with_context(|| format!("Failed to reach {}", target.rpc_url))?;
        let actual = reported.to::<u64>();

        let chain_id = match target.chain_id {
            Some(expected) if expected != actual => {
                return Err(ConfigurationError::ChainIdMismatch { expected, actual }.into());
            }
            Some(expected) => expected,
            None => actual,
        };

        tracing::info!(
            network = %target.name,
            rpc_url = %target.rpc_url,
            chain_id,
            deployer = %wallet.address(),
            "Connected to node"
        );

        Ok(Self {
            http,
            url: target.rpc_url.clone(),
            wallet,
            chain_id,
            gas: target.gas,
            confirmation,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// The deployer address.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T> {
        rpc::json_rpc_call(&self.http, self.url.as_str(), method, params).await
    }

    pub async fn balance(&self, address: Address) -> Result<U256> {
        self.call("eth_getBalance", vec![json!(address), json!("latest")])
            .await
    }

    /// Next nonce, counting transactions still in the pool.
    pub async fn nonce(&self, address: Address) -> Result<u64> {
        let nonce: U64 = self
            .call("eth_getTransactionCount", vec![json!(address), json!("pending")])
            .await?;
        Ok(nonce.to::<u64>())
    }

    /// Gas price per the target's policy.
    pub async fn gas_price(&self) -> Result<u128> {
        match self.gas {
            GasPolicy::Fixed { gas_price_wei } => Ok(u128::from(gas_price_wei)),
            GasPolicy::Network => {
                let price: U256 = self.call("eth_gasPrice", vec![]).await?;
                u128::try_from(price).map_err(|e| anyhow::anyhow!("Gas price out of range: {e}"))
            }
        }
    }

    pub async fn estimate_gas(&self, to: Option<Address>, input: &Bytes) -> Result<u64> {
        let mut request = json!({
            "from": self.address(),
            "data": input,
        });
        if let Some(to) = to {
            request["to"] = json!(to);
        }

        let gas: U64 = self
            .call("eth_estimateGas", vec![request])
            .await
            .context("Gas estimation failed (would the transaction revert?)")?;
        Ok(gas.to::<u64>())
    }

    pub async fn storage_at(&self, address: Address, slot: B256) -> Result<B256> {
        self.call(
            "eth_getStorageAt",
            vec![json!(address), json!(slot), json!("latest")],
        )
        .await
    }

    /// Sign and send a transaction, returning its hash. Never resends.
    pub async fn submit(&self, to: Option<Address>, input: Bytes) -> Result<B256> {
        let from = self.address();
        let nonce = self.nonce(from).await?;
        let gas_price = self.gas_price().await?;
        let gas_limit = self.estimate_gas(to, &input).await?;

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price,
            gas_limit,
            to: to.map_or(TxKind::Create, TxKind::Call),
            value: U256::ZERO,
            input,
        };
        let signed = self.wallet.sign_transaction(tx)?;
        let local_hash = signed.hash;

        let tx_hash: B256 = self
            .call("eth_sendRawTransaction", vec![json!(signed.raw)])
            .await
            .context("Failed to send transaction")?;

        if tx_hash != local_hash {
            tracing::warn!(%tx_hash, %local_hash, "Node reported an unexpected transaction hash");
        }

        tracing::debug!(%tx_hash, nonce, gas_price, gas_limit, "Transaction sent");
        Ok(tx_hash)
    }

    /// Wait for the receipt of `tx_hash`. Reverted transactions are errors.
    pub async fn confirm(&self, tx_hash: B256) -> Result<TransactionReceipt> {
        let receipt = rpc::wait_for_receipt(
            &self.http,
            self.url.as_str(),
            tx_hash,
            self.confirmation.poll_interval(),
            self.confirmation.max_polls(),
        )
        .await?;

        if !receipt.succeeded() {
            anyhow::bail!("Transaction {} reverted", tx_hash);
        }
        Ok(receipt)
    }

    /// Admin of an EIP-1967 proxy.
    pub async fn proxy_admin(&self, proxy: Address) -> Result<Address> {
        let word = self.storage_at(proxy, EIP1967_ADMIN_SLOT).await?;
        Ok(Address::from_word(word))
    }
}

impl From<&TransactionReceipt> for TxConfirmation {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number.map(|n| n.to::<u64>()),
            gas_used: receipt.gas_used,
        }
    }
}

/// Resolves contract names to artifacts deployed through a [`ChainClient`].
#[derive(Debug, Clone)]
pub struct ArtifactFactory {
    client: Arc<ChainClient>,
    store: ArtifactStore,
    proxy_artifact: String,
}

impl ArtifactFactory {
    pub fn new(client: Arc<ChainClient>, store: ArtifactStore, proxy_artifact: impl Into<String>) -> Self {
        Self {
            client,
            store,
            proxy_artifact: proxy_artifact.into(),
        }
    }
}

impl ContractFactory for ArtifactFactory {
    type Handle = RpcHandle;

    fn get_factory(&self, contract_name: &str) -> Result<RpcHandle, ConfigurationError> {
        let artifact = self.store.load(contract_name)?;
        Ok(RpcHandle {
            name: contract_name.to_string(),
            artifact: Arc::new(artifact),
            client: self.client.clone(),
            store: self.store.clone(),
            proxy_artifact: self.proxy_artifact.clone(),
        })
    }
}

/// A contract artifact bound to a chain connection.
#[derive(Debug, Clone)]
pub struct RpcHandle {
    name: String,
    artifact: Arc<Artifact>,
    client: Arc<ChainClient>,
    store: ArtifactStore,
    proxy_artifact: String,
}

impl RpcHandle {
    fn proxy(&self) -> Result<Artifact, ConfigurationError> {
        self.store.load(&self.proxy_artifact)
    }

    /// `TransparentUpgradeableProxy(logic, initialOwner, data)`.
    fn proxy_args(&self, logic: Address, init_data: Bytes) -> [ArgValue; 3] {
        [
            ArgValue::Address(logic),
            ArgValue::Address(self.client.address()),
            ArgValue::Bytes(init_data),
        ]
    }

    fn invalid_args(&self, e: anyhow::Error) -> ConfigurationError {
        ConfigurationError::UnknownContract {
            contract: self.name.clone(),
            reason: format!("{e:#}"),
        }
    }
}

impl DeployableHandle for RpcHandle {
    type Pending = PendingTx;

    fn contract_name(&self) -> &str {
        &self.name
    }

    fn check_args(
        &self,
        spec: &ContractDeploymentSpec,
        args: &[ArgValue],
    ) -> Result<(), ConfigurationError> {
        match spec.kind {
            DeploymentKind::Direct => self
                .artifact
                .encode_constructor(args)
                .map(drop)
                .map_err(|e| self.invalid_args(e)),
            DeploymentKind::Proxied => {
                self.artifact
                    .encode_constructor(&[])
                    .map_err(|e| self.invalid_args(e))?;
                let init_data = self
                    .artifact
                    .encode_call(spec.initializer(), args)
                    .map_err(|e| self.invalid_args(e))?;
                let proxy = self.proxy()?;
                proxy
                    .encode_constructor(&self.proxy_args(Address::ZERO, init_data))
                    .map(drop)
                    .map_err(|e| ConfigurationError::UnknownContract {
                        contract: self.proxy_artifact.clone(),
                        reason: format!("{e:#}"),
                    })
            }
        }
    }

    async fn deploy_proxy(&self, initializer: &str, init_args: &[ArgValue]) -> Result<PendingTx> {
        let init_data = self.artifact.encode_call(initializer, init_args)?;
        let proxy = self.proxy()?;

        let logic_hash = self.client.submit(None, self.artifact.deploy_code(&[])?).await?;
        tracing::info!(contract = %self.name, tx_hash = %logic_hash, "Implementation submitted, waiting for confirmation...");

        let logic_receipt = self.client.confirm(logic_hash).await?;
        let logic = logic_receipt
            .contract_address
            .context("Implementation receipt has no contract address")?;
        tracing::info!(contract = %self.name, implementation = %logic, "Implementation deployed");

        let code = proxy.deploy_code(&self.proxy_args(logic, init_data))?;
        let tx_hash = self.client.submit(None, code).await?;
        tracing::info!(contract = %self.name, %tx_hash, proxy = %self.proxy_artifact, "Proxy submitted");

        Ok(PendingTx {
            client: self.client.clone(),
            tx_hash,
            implementation: Some(logic),
        })
    }

    async fn deploy(&self, constructor_args: &[ArgValue]) -> Result<PendingTx> {
        let code = self.artifact.deploy_code(constructor_args)?;
        let tx_hash = self.client.submit(None, code).await?;
        tracing::info!(contract = %self.name, %tx_hash, "Deployment submitted");

        Ok(PendingTx {
            client: self.client.clone(),
            tx_hash,
            implementation: None,
        })
    }
}

/// A deployment transaction sent through a [`ChainClient`].
#[derive(Debug)]
pub struct PendingTx {
    client: Arc<ChainClient>,
    tx_hash: B256,
    /// Set when this transaction creates a proxy.
    implementation: Option<Address>,
}

impl PendingDeployment for PendingTx {
    fn tx_hash(&self) -> B256 {
        self.tx_hash
    }

    async fn wait_for_confirmation(self) -> Result<ConfirmedDeployment> {
        let receipt = self.client.confirm(self.tx_hash).await?;
        let address = receipt
            .contract_address
            .with_context(|| format!("Receipt of {} has no contract address", self.tx_hash))?;

        let admin = match self.implementation {
            Some(_) => Some(self.client.proxy_admin(address).await?),
            None => None,
        };

        Ok(ConfirmedDeployment {
            address,
            confirmation: TxConfirmation::from(&receipt),
            implementation: self.implementation,
            admin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_core::primitives::keccak256;

    #[test]
    fn test_admin_slot_matches_eip1967() {
        let hash = U256::from_be_bytes(keccak256("eip1967.proxy.admin").0);
        assert_eq!(B256::from(hash - U256::from(1)), EIP1967_ADMIN_SLOT);
    }

    #[test]
    fn test_admin_is_read_from_low_bytes() {
        let word = B256::left_padding_from(Address::repeat_byte(0xab).as_slice());
        assert_eq!(Address::from_word(word), Address::repeat_byte(0xab));
    }

    #[test]
    fn test_confirmation_from_receipt() {
        let receipt = TransactionReceipt {
            transaction_hash: B256::repeat_byte(1),
            block_number: Some(U64::from(12)),
            contract_address: Some(Address::repeat_byte(2)),
            status: Some(U64::from(1)),
            gas_used: U256::from(50_000),
        };
        let confirmation = TxConfirmation::from(&receipt);
        assert_eq!(confirmation.block_number, Some(12));
        assert_eq!(confirmation.gas_used, U256::from(50_000));
    }
}
