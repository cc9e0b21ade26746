//! The contract factory boundary.
//!
//! The sequencer and drivers only see these traits. [`crate::chain`] implements them
//! over JSON-RPC; tests implement them over an in-memory chain.

use std::future::Future;

use alloy_core::primitives::{Address, B256};
use anyhow::Result;

use crate::{
    error::ConfigurationError,
    plan::{ArgValue, ContractDeploymentSpec, TxConfirmation},
};

/// Hands out deployable handles by contract name.
pub trait ContractFactory: Send + Sync {
    type Handle: DeployableHandle;

    /// Obtain a handle for `contract_name`. Unknown contracts are configuration errors.
    fn get_factory(&self, contract_name: &str) -> Result<Self::Handle, ConfigurationError>;
}

/// A contract that can be deployed, directly or behind a proxy.
pub trait DeployableHandle: Send + Sync {
    type Pending: PendingDeployment;

    fn contract_name(&self) -> &str;

    /// Check that `args` fit the constructor or initializer of `spec` without
    /// submitting anything. References are checked with a placeholder address.
    fn check_args(
        &self,
        spec: &ContractDeploymentSpec,
        args: &[ArgValue],
    ) -> Result<(), ConfigurationError>;

    /// Submit a proxy whose construction calls `initializer(init_args)` on the logic contract.
    fn deploy_proxy(
        &self,
        initializer: &str,
        init_args: &[ArgValue],
    ) -> impl Future<Output = Result<Self::Pending>> + Send;

    /// Submit a plain deployment with `constructor_args`.
    fn deploy(&self, constructor_args: &[ArgValue])
    -> impl Future<Output = Result<Self::Pending>> + Send;
}

/// A submitted deployment transaction.
pub trait PendingDeployment: Send {
    fn tx_hash(&self) -> B256;

    /// Suspend until the transaction is confirmed. Reverts and timeouts are errors.
    fn wait_for_confirmation(self) -> impl Future<Output = Result<ConfirmedDeployment>> + Send;
}

/// What a confirmed deployment yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedDeployment {
    /// The address callers use.
    pub address: Address,
    pub confirmation: TxConfirmation,
    /// Logic contract, for proxies.
    pub implementation: Option<Address>,
    /// Proxy admin, for proxies.
    pub admin: Option<Address>,
}
