use std::sync::Arc;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};

use crate::{
    ArtifactFactory, ArtifactStore, ChainClient, DeployConfig, DeployError, DeployedContractRecord,
    DeploymentManifest, DeploymentPlan, DeploymentTarget, PlanStage, Secrets, Sequencer,
    network::TargetName,
};

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub target: TargetName,
    pub chain_id: u64,
    /// Account that signed every transaction.
    pub deployer: Address,
    pub plan: DeploymentPlan,
    /// One record per plan entry, in plan order.
    pub records: Vec<DeployedContractRecord>,
}

impl DeploymentOutcome {
    /// Build the manifest describing this run.
    pub fn manifest(&self) -> Result<DeploymentManifest> {
        DeploymentManifest::new(
            &self.plan,
            self.target,
            self.chain_id,
            self.deployer,
            self.records.clone(),
        )
    }
}

/// Deploys plans against one resolved target.
///
/// Built once at startup (see [`crate::DeployerBuilder`]) and passed around
/// explicitly; nothing here reads ambient configuration.
#[derive(Debug, Clone)]
pub struct Deployer {
    pub config: DeployConfig,
    pub target: DeploymentTarget,
    pub secrets: Secrets,
}

impl Deployer {
    pub fn new(config: DeployConfig, target: DeploymentTarget, secrets: Secrets) -> Self {
        Self {
            config,
            target,
            secrets,
        }
    }

    /// Deploy one of the built-in plans.
    pub async fn deploy(&self, stage: PlanStage) -> Result<DeploymentOutcome> {
        tracing::info!(stage = %stage, network = %self.target.name, "Starting deployment process...");
        self.deploy_plan(stage.plan()).await
    }

    /// Deploy an arbitrary plan.
    ///
    /// Plan ordering and secrets are checked before the node is contacted. Artifacts
    /// and argument types are checked before the first transaction is sent.
    pub async fn deploy_plan(&self, plan: DeploymentPlan) -> Result<DeploymentOutcome> {
        plan.validate()?;
        for spec in &plan.entries {
            spec.plan_args(&self.secrets).map_err(DeployError::from)?;
        }

        let client = Arc::new(
            ChainClient::connect(&self.target, self.config.confirmation.clone()).await?,
        );

        let deployer = client.address();
        let balance = client
            .balance(deployer)
            .await
            .context("Failed to fetch deployer balance")?;
        tracing::info!(
            deployer = %deployer,
            balance_wei = %balance,
            "Deploying contracts with the account {}",
            deployer
        );

        let factory = ArtifactFactory::new(
            client.clone(),
            ArtifactStore::new(&self.config.artifacts_dir),
            self.config.proxy_artifact.clone(),
        );

        let mut sequencer = Sequencer::new(&factory, &self.secrets);
        let records = sequencer.run(&plan).await?;

        tracing::info!(
            network = %self.target.name,
            contracts = records.len(),
            "Deployment complete"
        );

        Ok(DeploymentOutcome {
            target: self.target.name,
            chain_id: client.chain_id(),
            deployer,
            plan,
            records,
        })
    }
}
