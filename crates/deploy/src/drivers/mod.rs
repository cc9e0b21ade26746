//! Deployment drivers: one per [`DeploymentKind`](crate::plan::DeploymentKind).

mod direct;
mod proxy;

pub use direct::DirectDriver;
pub use proxy::ProxyDriver;

use std::future::Future;

use crate::{
    error::DeployError,
    plan::{ArgValue, DeployedContractRecord, DeploymentKind, EntryState, PlannedArg, lookup_address},
    traits::{ConfirmedDeployment, DeployableHandle, PendingDeployment},
};

/// Callback receiving each state an entry goes through.
pub type StateSink<'a> = &'a mut (dyn FnMut(EntryState) + Send);

/// Substitute contract references with the addresses of earlier records.
pub fn resolve_args(
    entry: &str,
    args: &[PlannedArg],
    records: &[DeployedContractRecord],
) -> Result<Vec<ArgValue>, DeployError> {
    args.iter()
        .map(|arg| match arg {
            PlannedArg::Value(value) => Ok(value.clone()),
            PlannedArg::Reference(reference) => {
                lookup_address(records, entry, reference).map(ArgValue::Address)
            }
        })
        .collect()
}

/// Await confirmation of a submitted deployment and turn it into a record.
async fn confirm<P: PendingDeployment>(
    contract_name: &str,
    kind: DeploymentKind,
    pending: P,
    on_state: StateSink<'_>,
) -> anyhow::Result<DeployedContractRecord> {
    on_state(EntryState::Confirming);
    tracing::info!(
        contract = contract_name,
        tx_hash = %pending.tx_hash(),
        "Waiting for confirmation..."
    );

    let ConfirmedDeployment {
        address,
        confirmation,
        implementation,
        admin,
    } = pending.wait_for_confirmation().await?;

    Ok(DeployedContractRecord {
        contract_name: contract_name.to_string(),
        address,
        kind,
        implementation,
        admin,
        confirmation,
    })
}

/// Shared by both drivers: submit through `submit`, then confirm.
async fn submit_and_confirm<H, F>(
    handle: &H,
    kind: DeploymentKind,
    on_state: StateSink<'_>,
    submit: F,
) -> anyhow::Result<DeployedContractRecord>
where
    H: DeployableHandle,
    F: Future<Output = anyhow::Result<H::Pending>> + Send,
{
    on_state(EntryState::Submitting);
    let pending = submit.await?;
    confirm(handle.contract_name(), kind, pending, on_state).await
}
