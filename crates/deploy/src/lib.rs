//! spoc-deploy - Deployment library for the SPOC token and staking contracts.
//!
//! This crate resolves a target network, checks a deployment plan against the
//! secrets and the compiled artifacts, and then deploys the plan entry by entry:
//! the token behind an upgradeable proxy, the staking contract wired to it.

mod builder;
pub use builder::DeployerBuilder;

mod deployer;
pub use deployer::{Deployer, DeploymentOutcome};

pub mod artifacts;
pub use artifacts::{Artifact, ArtifactStore};

pub mod chain;
pub use chain::{ArtifactFactory, ChainClient, EIP1967_ADMIN_SLOT, PendingTx, RpcHandle};

pub mod config;
pub use config::{ConfirmationConfig, DeployConfig, SPOCCONF_FILENAME};

pub mod drivers;
pub use drivers::{DirectDriver, ProxyDriver};

pub mod error;
pub use error::{ConfigurationError, DeployError, DeploymentStage};

pub mod manifest;
pub use manifest::{DeploymentManifest, MANIFEST_FILENAME};

pub mod network;
pub use network::{DeploymentTarget, GasPolicy, NetworkProfile, NetworkProfiles, TargetName};

pub mod plan;
pub use plan::{
    ArgSource, ArgValue, ContractDeploymentSpec, DeployedContractRecord, DeploymentKind,
    DeploymentPlan, EntryState, PlanStage, STAKING_CONTRACT, TOKEN_CONTRACT, TxConfirmation,
};

pub mod rpc;

pub mod secrets;
pub use secrets::{SecretKey, Secrets, SigningCredential};

mod sequencer;
pub use sequencer::Sequencer;

pub mod traits;
pub use traits::{ConfirmedDeployment, ContractFactory, DeployableHandle, PendingDeployment};

pub mod tx;
