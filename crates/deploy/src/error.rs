//! Error taxonomy for deployment runs.
//!
//! Configuration problems are detected before anything is submitted on chain.
//! Deployment errors name the stage that failed and carry the underlying cause.
//! Unresolved references point at a plan-ordering bug.

use serde::{Deserialize, Serialize};

use crate::secrets::SecretKey;

/// Boxed cause attached to a [`DeployError::Deployment`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Invalid or missing configuration. Always fatal, always raised before any transaction is sent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown deployment target '{0}' (expected one of: local, test, production)")]
    UnknownTarget(String),

    #[error("missing secret '{0}'")]
    MissingSecret(SecretKey),

    #[error("invalid secret '{key}': {reason}")]
    InvalidSecret { key: SecretKey, reason: String },

    #[error("failed to load secrets")]
    Secrets(#[source] BoxError),

    #[error("invalid deploy configuration: {0}")]
    Config(String),

    #[error("cannot obtain a deployable handle for '{contract}': {reason}")]
    UnknownContract { contract: String, reason: String },

    #[error("chain id mismatch: target expects {expected}, node reports {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("invalid deployment plan: {0}")]
    InvalidPlan(String),
}

/// Stage at which a deployment failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeploymentStage {
    ProxyDeploy,
    DirectDeploy,
}

/// Error surfaced by the drivers and the sequencer.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("{stage} of '{contract}' failed: {cause}")]
    Deployment {
        stage: DeploymentStage,
        contract: String,
        #[source]
        cause: BoxError,
    },

    #[error("'{entry}' references '{reference}', which has not been deployed yet")]
    UnresolvedReference { entry: String, reference: String },
}

impl DeployError {
    /// Wrap a lower level failure for the given stage.
    pub fn deployment(
        stage: DeploymentStage,
        contract: impl Into<String>,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self::Deployment {
            stage,
            contract: contract.into(),
            cause: cause.into(),
        }
    }

    /// The failed stage, if this is a deployment error.
    pub fn stage(&self) -> Option<DeploymentStage> {
        match self {
            Self::Deployment { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_matches_wire_names() {
        assert_eq!(DeploymentStage::ProxyDeploy.to_string(), "proxy-deploy");
        assert_eq!(DeploymentStage::DirectDeploy.to_string(), "direct-deploy");
        assert_eq!(
            serde_json::to_string(&DeploymentStage::ProxyDeploy).unwrap(),
            "\"proxy-deploy\""
        );
    }

    #[test]
    fn test_deployment_error_keeps_cause() {
        let err = DeployError::deployment(
            DeploymentStage::DirectDeploy,
            "SpocStakingContract",
            anyhow::anyhow!("connection refused"),
        );

        assert_eq!(err.stage(), Some(DeploymentStage::DirectDeploy));
        let source = std::error::Error::source(&err).expect("cause should be attached");
        assert_eq!(source.to_string(), "connection refused");
        assert!(err.to_string().starts_with("direct-deploy of 'SpocStakingContract' failed"));
    }

    #[test]
    fn test_configuration_error_is_transparent() {
        let err: DeployError = ConfigurationError::MissingSecret(SecretKey::TokenAddress).into();
        assert_eq!(err.to_string(), "missing secret 'tokenAddress'");
        assert!(err.stage().is_none());
    }
}
