//! Deployment plans: what to deploy, in which order, with which arguments.

use std::collections::HashSet;

use alloy_core::{
    dyn_abi::{DynSolType, DynSolValue},
    primitives::{Address, B256, Bytes, U256},
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigurationError, DeployError},
    secrets::{SecretKey, Secrets},
};

/// The upgradeable token contract.
pub const TOKEN_CONTRACT: &str = "SpocTokenV1";
/// The staking contract, wired to the token.
pub const STAKING_CONTRACT: &str = "SpocStakingContract";
/// Initializer called through the proxy when none is named.
pub const DEFAULT_INITIALIZER: &str = "initialize";

/// A concrete argument value.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display, derive_more::From,
)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ArgValue {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
}

impl ArgValue {
    /// Convert to an ABI value of type `ty`.
    ///
    /// Integers are sized to the parameter (`uint8` .. `uint256`); everything else must
    /// match the parameter kind exactly.
    pub fn to_sol_value(&self, ty: &DynSolType) -> anyhow::Result<DynSolValue> {
        let value = match (self, ty) {
            (ArgValue::Address(a), DynSolType::Address) => DynSolValue::Address(*a),
            (ArgValue::Uint(v), DynSolType::Uint(bits)) => {
                if *bits < 256 && v.bit_len() > *bits {
                    anyhow::bail!("{v} does not fit in uint{bits}");
                }
                DynSolValue::Uint(*v, *bits)
            }
            (ArgValue::Bool(b), DynSolType::Bool) => DynSolValue::Bool(*b),
            (ArgValue::String(s), DynSolType::String) => DynSolValue::String(s.clone()),
            (ArgValue::Bytes(b), DynSolType::Bytes) => DynSolValue::Bytes(b.to_vec()),
            (value, ty) => anyhow::bail!("cannot pass {value} as {}", ty.sol_type_name()),
        };
        Ok(value)
    }
}

/// Where an argument value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum ArgSource {
    /// A fixed value.
    Literal(ArgValue),
    /// A value read from the secrets store.
    Secret(SecretKey),
    /// The address of a contract deployed earlier in the same plan.
    ContractAddress(String),
}

/// An argument after pre-flight: either a concrete value or a reference that is
/// resolved against the records produced so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedArg {
    Value(ArgValue),
    Reference(String),
}

impl PlannedArg {
    /// Value used when type checking before anything is deployed.
    pub fn placeholder(&self) -> ArgValue {
        match self {
            PlannedArg::Value(value) => value.clone(),
            PlannedArg::Reference(_) => ArgValue::Address(Address::ZERO),
        }
    }
}

/// How a contract is deployed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeploymentKind {
    /// Behind an upgradeable proxy; args go to the initializer.
    Proxied,
    /// Plain deployment; args go to the constructor.
    Direct,
}

/// One entry of a [`DeploymentPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDeploymentSpec {
    pub contract_name: String,
    pub kind: DeploymentKind,
    /// Constructor args for direct deployments, initializer args for proxied ones.
    #[serde(default)]
    pub args: Vec<ArgSource>,
    /// Initializer run through the proxy. Ignored for direct deployments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initializer: Option<String>,
}

impl ContractDeploymentSpec {
    pub fn proxied(contract_name: impl Into<String>, init_args: Vec<ArgSource>) -> Self {
        Self {
            contract_name: contract_name.into(),
            kind: DeploymentKind::Proxied,
            args: init_args,
            initializer: None,
        }
    }

    pub fn direct(contract_name: impl Into<String>, constructor_args: Vec<ArgSource>) -> Self {
        Self {
            contract_name: contract_name.into(),
            kind: DeploymentKind::Direct,
            args: constructor_args,
            initializer: None,
        }
    }

    pub fn with_initializer(mut self, initializer: impl Into<String>) -> Self {
        self.initializer = Some(initializer.into());
        self
    }

    /// The initializer to call through the proxy.
    pub fn initializer(&self) -> &str {
        self.initializer.as_deref().unwrap_or(DEFAULT_INITIALIZER)
    }

    /// Resolve literal and secret arguments. Contract references stay symbolic.
    pub fn plan_args(&self, secrets: &Secrets) -> Result<Vec<PlannedArg>, ConfigurationError> {
        self.args
            .iter()
            .map(|source| match source {
                ArgSource::Literal(value) => Ok(PlannedArg::Value(value.clone())),
                ArgSource::Secret(key) => {
                    secrets.address(*key).map(|a| PlannedArg::Value(a.into()))
                }
                ArgSource::ContractAddress(name) => Ok(PlannedArg::Reference(name.clone())),
            })
            .collect()
    }

    fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|source| match source {
            ArgSource::ContractAddress(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

/// An ordered list of contracts to deploy in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    pub entries: Vec<ContractDeploymentSpec>,
}

impl DeploymentPlan {
    pub fn new(entries: Vec<ContractDeploymentSpec>) -> Self {
        Self { entries }
    }

    /// Check that the plan can run in its declared order.
    ///
    /// Contract names must be unique and every contract reference must point at a
    /// strictly earlier entry.
    pub fn validate(&self) -> Result<(), DeployError> {
        if self.entries.is_empty() {
            return Err(ConfigurationError::InvalidPlan("the plan is empty".to_string()).into());
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            for reference in entry.references() {
                if !seen.contains(reference) {
                    return Err(DeployError::UnresolvedReference {
                        entry: entry.contract_name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }

            if !seen.insert(entry.contract_name.as_str()) {
                return Err(ConfigurationError::InvalidPlan(format!(
                    "'{}' appears more than once",
                    entry.contract_name
                ))
                .into());
            }
        }

        Ok(())
    }
}

/// The built-in plans, one per CLI stage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PlanStage {
    /// Deploy the token behind a proxy.
    Token,
    /// Deploy the staking contract against an existing token.
    Staking,
    /// Deploy the token, then the staking contract wired to it.
    All,
}

impl PlanStage {
    pub fn plan(&self) -> DeploymentPlan {
        match self {
            PlanStage::Token => DeploymentPlan::new(vec![token_entry()]),
            PlanStage::Staking => DeploymentPlan::new(vec![staking_entry(ArgSource::Secret(
                SecretKey::TokenAddress,
            ))]),
            PlanStage::All => DeploymentPlan::new(vec![
                token_entry(),
                staking_entry(ArgSource::ContractAddress(TOKEN_CONTRACT.to_string())),
            ]),
        }
    }
}

fn token_entry() -> ContractDeploymentSpec {
    ContractDeploymentSpec::proxied(TOKEN_CONTRACT, vec![])
}

fn staking_entry(token: ArgSource) -> ContractDeploymentSpec {
    ContractDeploymentSpec::direct(
        STAKING_CONTRACT,
        vec![
            token,
            ArgSource::Secret(SecretKey::DevAddress),
            ArgSource::Secret(SecretKey::RewardToken),
        ],
    )
}

/// Lifecycle of a single plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryState {
    Pending,
    Submitting,
    Confirming,
    Confirmed,
    Failed,
}

/// Receipt data kept for a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxConfirmation {
    pub transaction_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: U256,
}

/// A contract confirmed on chain. Built once per entry, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContractRecord {
    pub contract_name: String,
    /// The address callers use: the proxy for proxied deployments.
    pub address: Address,
    pub kind: DeploymentKind,
    /// Logic contract behind the proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<Address>,
    /// Proxy admin read from the EIP-1967 admin slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Address>,
    pub confirmation: TxConfirmation,
}

/// Find the address of `reference` among the records produced so far.
pub fn lookup_address(
    records: &[DeployedContractRecord],
    entry: &str,
    reference: &str,
) -> Result<Address, DeployError> {
    records
        .iter()
        .find(|record| record.contract_name == reference)
        .map(|record| record.address)
        .ok_or_else(|| DeployError::UnresolvedReference {
            entry: entry.to_string(),
            reference: reference.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn secrets() -> Secrets {
        Secrets {
            token_address: Some(Address::from_str("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap()),
            dev_address: Some(Address::from_str("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").unwrap()),
            reward_token: Some(Address::from_str("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC").unwrap()),
            ..Default::default()
        }
    }

    #[test]
    fn test_builtin_plans_are_valid() {
        for stage in PlanStage::iter() {
            stage.plan().validate().unwrap_or_else(|e| panic!("{stage} plan is invalid: {e}"));
        }
    }

    #[test]
    fn test_all_plan_wires_staking_to_token() {
        let plan = PlanStage::All.plan();
        assert_eq!(plan.entries[0].contract_name, TOKEN_CONTRACT);
        assert_eq!(plan.entries[0].kind, DeploymentKind::Proxied);
        assert_eq!(plan.entries[1].contract_name, STAKING_CONTRACT);
        assert_eq!(
            plan.entries[1].args[0],
            ArgSource::ContractAddress(TOKEN_CONTRACT.to_string())
        );
    }

    #[test]
    fn test_forward_reference_is_unresolved() {
        let plan = DeploymentPlan::new(vec![
            ContractDeploymentSpec::direct(
                STAKING_CONTRACT,
                vec![ArgSource::ContractAddress(TOKEN_CONTRACT.to_string())],
            ),
            token_entry(),
        ]);

        assert!(matches!(
            plan.validate(),
            Err(DeployError::UnresolvedReference { entry, reference })
                if entry == STAKING_CONTRACT && reference == TOKEN_CONTRACT
        ));
    }

    #[test]
    fn test_self_reference_and_duplicates() {
        let self_ref = DeploymentPlan::new(vec![ContractDeploymentSpec::direct(
            "Loop",
            vec![ArgSource::ContractAddress("Loop".to_string())],
        )]);
        assert!(matches!(
            self_ref.validate(),
            Err(DeployError::UnresolvedReference { .. })
        ));

        let duplicate = DeploymentPlan::new(vec![token_entry(), token_entry()]);
        assert!(matches!(
            duplicate.validate(),
            Err(DeployError::Configuration(ConfigurationError::InvalidPlan(_)))
        ));

        assert!(DeploymentPlan::default().validate().is_err());
    }

    #[test]
    fn test_plan_args_resolve_secrets() {
        let planned = PlanStage::Staking.plan().entries[0]
            .plan_args(&secrets())
            .unwrap();
        assert_eq!(planned.len(), 3);
        assert!(planned.iter().all(|arg| matches!(arg, PlannedArg::Value(ArgValue::Address(_)))));

        let missing = Secrets {
            token_address: None,
            ..secrets()
        };
        assert!(matches!(
            PlanStage::Staking.plan().entries[0].plan_args(&missing),
            Err(ConfigurationError::MissingSecret(SecretKey::TokenAddress))
        ));
    }

    #[test]
    fn test_references_stay_symbolic() {
        let planned = PlanStage::All.plan().entries[1].plan_args(&secrets()).unwrap();
        assert_eq!(planned[0], PlannedArg::Reference(TOKEN_CONTRACT.to_string()));
        assert_eq!(planned[0].placeholder(), ArgValue::Address(Address::ZERO));
    }

    #[test]
    fn test_to_sol_value() {
        let value = ArgValue::Uint(U256::from(255));
        assert_eq!(
            value.to_sol_value(&DynSolType::Uint(8)).unwrap(),
            DynSolValue::Uint(U256::from(255), 8)
        );
        assert!(ArgValue::Uint(U256::from(256)).to_sol_value(&DynSolType::Uint(8)).is_err());
        assert!(ArgValue::Bool(true).to_sol_value(&DynSolType::Address).is_err());
    }

    #[test]
    fn test_default_initializer() {
        assert_eq!(token_entry().initializer(), "initialize");
        assert_eq!(token_entry().with_initializer("setUp").initializer(), "setUp");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!("all".parse::<PlanStage>().unwrap(), PlanStage::All);
        assert_eq!(PlanStage::Staking.to_string(), "staking");
    }
}
