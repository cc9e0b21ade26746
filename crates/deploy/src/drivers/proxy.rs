use std::collections::HashSet;

use crate::{
    error::{DeployError, DeploymentStage},
    plan::{DeployedContractRecord, DeploymentKind, PlannedArg},
    traits::DeployableHandle,
};

use super::{StateSink, resolve_args, submit_and_confirm};

/// Deploys logic contracts behind an upgradeable proxy.
///
/// The initializer call is part of the proxy's construction, so each proxy is
/// initialized exactly once. The driver also remembers which entries it has
/// submitted and refuses to submit any of them again in the same run.
#[derive(Debug, Default)]
pub struct ProxyDriver {
    submitted: HashSet<String>,
}

impl ProxyDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a proxy for `contract_name` was already submitted.
    pub fn was_submitted(&self, contract_name: &str) -> bool {
        self.submitted.contains(contract_name)
    }

    pub async fn deploy<H: DeployableHandle>(
        &mut self,
        handle: &H,
        initializer: &str,
        init_args: &[PlannedArg],
        records: &[DeployedContractRecord],
        on_state: StateSink<'_>,
    ) -> Result<DeployedContractRecord, DeployError> {
        let contract = handle.contract_name().to_string();
        let init_args = resolve_args(&contract, init_args, records)?;

        if !self.submitted.insert(contract.clone()) {
            return Err(DeployError::deployment(
                DeploymentStage::ProxyDeploy,
                contract,
                anyhow::anyhow!(
                    "a proxy was already submitted for this entry; refusing to deploy and initialize it again"
                ),
            ));
        }

        tracing::info!(contract = %contract, initializer, "Deploying behind proxy...");

        submit_and_confirm(
            handle,
            DeploymentKind::Proxied,
            on_state,
            handle.deploy_proxy(initializer, &init_args),
        )
        .await
        .map_err(|e| DeployError::deployment(DeploymentStage::ProxyDeploy, contract, e))
    }
}
