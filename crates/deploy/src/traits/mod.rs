//! Trait seams between the sequencer and the chain.

mod factory;

pub use factory::{ConfirmedDeployment, ContractFactory, DeployableHandle, PendingDeployment};
