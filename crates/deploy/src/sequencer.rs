//! Runs a [`DeploymentPlan`] entry by entry.
//!
//! Everything that can be checked without touching the chain is checked first:
//! plan ordering, secrets, artifacts and argument types. Entries then run strictly
//! in order and the first failure aborts the rest.

use crate::{
    drivers::{DirectDriver, ProxyDriver},
    error::DeployError,
    plan::{
        ContractDeploymentSpec, DeployedContractRecord, DeploymentKind, DeploymentPlan,
        EntryState, PlannedArg,
    },
    secrets::Secrets,
    traits::{ContractFactory, DeployableHandle},
};

/// An entry that passed pre-flight.
struct PreparedEntry<'p, H> {
    spec: &'p ContractDeploymentSpec,
    handle: H,
    args: Vec<PlannedArg>,
}

/// Drives the proxy and direct drivers over a plan.
pub struct Sequencer<'a, F: ContractFactory> {
    factory: &'a F,
    secrets: &'a Secrets,
    proxy_driver: ProxyDriver,
    direct_driver: DirectDriver,
    states: Vec<(String, EntryState)>,
}

impl<'a, F: ContractFactory> Sequencer<'a, F> {
    pub fn new(factory: &'a F, secrets: &'a Secrets) -> Self {
        Self {
            factory,
            secrets,
            proxy_driver: ProxyDriver::new(),
            direct_driver: DirectDriver::new(),
            states: Vec::new(),
        }
    }

    /// State of every entry of the last run, in plan order.
    pub fn states(&self) -> &[(String, EntryState)] {
        &self.states
    }

    pub fn state_of(&self, contract_name: &str) -> Option<EntryState> {
        self.states
            .iter()
            .find(|(name, _)| name == contract_name)
            .map(|(_, state)| *state)
    }

    fn prepare<'p>(
        &self,
        plan: &'p DeploymentPlan,
    ) -> Result<Vec<PreparedEntry<'p, F::Handle>>, DeployError> {
        plan.validate()?;

        plan.entries
            .iter()
            .map(|spec| -> Result<PreparedEntry<'p, F::Handle>, DeployError> {
                let handle = self.factory.get_factory(&spec.contract_name)?;
                let args = spec.plan_args(self.secrets)?;

                let placeholders: Vec<_> = args.iter().map(PlannedArg::placeholder).collect();
                handle.check_args(spec, &placeholders)?;

                Ok(PreparedEntry { spec, handle, args })
            })
            .collect()
    }

    /// Run `plan` to completion or to its first failure.
    ///
    /// Returns one record per entry, in plan order. Nothing is submitted when
    /// pre-flight fails.
    pub async fn run(
        &mut self,
        plan: &DeploymentPlan,
    ) -> Result<Vec<DeployedContractRecord>, DeployError> {
        self.states = plan
            .entries
            .iter()
            .map(|spec| (spec.contract_name.clone(), EntryState::Pending))
            .collect();

        let prepared = self.prepare(plan)?;
        tracing::info!(entries = prepared.len(), "Deployment plan checked, starting deployment...");

        let mut records: Vec<DeployedContractRecord> = Vec::with_capacity(prepared.len());
        for (index, entry) in prepared.iter().enumerate() {
            let states = &mut self.states;
            let mut on_state = |state: EntryState| {
                tracing::debug!(contract = %states[index].0, %state, "Entry state changed");
                states[index].1 = state;
            };

            let result = match entry.spec.kind {
                DeploymentKind::Proxied => {
                    self.proxy_driver
                        .deploy(
                            &entry.handle,
                            entry.spec.initializer(),
                            &entry.args,
                            &records,
                            &mut on_state,
                        )
                        .await
                }
                DeploymentKind::Direct => {
                    self.direct_driver
                        .deploy(&entry.handle, &entry.args, &records, &mut on_state)
                        .await
                }
            };

            match result {
                Ok(record) => {
                    self.states[index].1 = EntryState::Confirmed;
                    tracing::info!(
                        contract = %record.contract_name,
                        address = %record.address,
                        "{} deployed to {}",
                        record.contract_name,
                        record.address
                    );
                    records.push(record);
                }
                Err(e) => {
                    self.states[index].1 = EntryState::Failed;
                    tracing::error!(
                        contract = entry.handle.contract_name(),
                        error = %e,
                        remaining = prepared.len() - index - 1,
                        "Deployment failed, aborting the remaining entries"
                    );
                    return Err(e);
                }
            }
        }

        Ok(records)
    }
}
