//! Deployment manifest written after a successful run.
//!
//! The manifest is output only. Nothing in this crate reads it back to decide what to
//! deploy; [`DeploymentManifest::load_from_file`] exists for inspection and tooling.

use std::path::Path;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{network::TargetName, plan::{DeployedContractRecord, DeploymentPlan}};

/// Default manifest file name.
pub const MANIFEST_FILENAME: &str = "deployments.json";

/// The inputs that determine what a run deploys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanFingerprint<'a> {
    pub target: TargetName,
    pub chain_id: u64,
    pub plan: &'a DeploymentPlan,
}

impl PlanFingerprint<'_> {
    /// Hex-encoded SHA-256 of the JSON encoding of the fingerprint.
    pub fn compute_hash(&self) -> Result<String> {
        let json = serde_json::to_string(self).context("Failed to serialize deployment plan")?;

        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Record of one successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentManifest {
    /// SHA-256 of the target, chain id and plan.
    pub plan_hash: String,
    pub target: TargetName,
    pub chain_id: u64,
    pub deployer: Address,
    pub contracts: Vec<DeployedContractRecord>,
    pub deployed_at: DateTime<Utc>,
    /// Version of the tool that produced the manifest.
    pub spoc_version: String,
}

impl DeploymentManifest {
    pub fn new(
        plan: &DeploymentPlan,
        target: TargetName,
        chain_id: u64,
        deployer: Address,
        contracts: Vec<DeployedContractRecord>,
    ) -> Result<Self> {
        let plan_hash = PlanFingerprint {
            target,
            chain_id,
            plan,
        }
        .compute_hash()?;

        Ok(Self {
            plan_hash,
            target,
            chain_id,
            deployer,
            contracts,
            deployed_at: Utc::now(),
            spoc_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Address of a deployed contract, by name.
    pub fn address_of(&self, contract_name: &str) -> Option<Address> {
        self.contracts
            .iter()
            .find(|record| record.contract_name == contract_name)
            .map(|record| record.address)
    }

    /// Save the manifest as pretty-printed JSON.
    ///
    /// A `path` that is a directory, or has no extension, is treated as a directory
    /// (created if needed) and the manifest is written to `<path>/deployments.json`.
    pub fn save_to_file(&self, path: &Path) -> Result<std::path::PathBuf> {
        let path = if path.is_dir() || path.extension().is_none() {
            std::fs::create_dir_all(path)
                .context(format!("Failed to create directory {}", path.display()))?;
            path.join(MANIFEST_FILENAME)
        } else {
            path.to_path_buf()
        };

        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize deployment manifest")?;
        std::fs::write(&path, json)
            .context(format!("Failed to write deployment manifest to {}", path.display()))?;

        tracing::info!(path = %path.display(), "Deployment manifest saved");
        Ok(path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Deployment manifest does not exist: {}", path.display());
        }

        let content = std::fs::read_to_string(path).context(format!(
            "Failed to read deployment manifest from {}",
            path.display()
        ))?;

        serde_json::from_str(&content).context("Failed to parse deployment manifest JSON")
    }
}
