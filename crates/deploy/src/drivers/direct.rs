use crate::{
    error::{DeployError, DeploymentStage},
    plan::{DeployedContractRecord, DeploymentKind, PlannedArg},
    traits::DeployableHandle,
};

use super::{StateSink, resolve_args, submit_and_confirm};

/// Deploys contracts without a proxy.
#[derive(Debug, Default)]
pub struct DirectDriver;

impl DirectDriver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve constructor arguments against `records`, deploy and wait for confirmation.
    pub async fn deploy<H: DeployableHandle>(
        &self,
        handle: &H,
        constructor_args: &[PlannedArg],
        records: &[DeployedContractRecord],
        on_state: StateSink<'_>,
    ) -> Result<DeployedContractRecord, DeployError> {
        let contract = handle.contract_name().to_string();
        let constructor_args = resolve_args(&contract, constructor_args, records)?;

        tracing::info!(
            contract = %contract,
            args = ?constructor_args.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Deploying..."
        );

        submit_and_confirm(
            handle,
            DeploymentKind::Direct,
            on_state,
            handle.deploy(&constructor_args),
        )
        .await
        .map_err(|e| DeployError::deployment(DeploymentStage::DirectDeploy, contract, e))
    }
}
