//! Builder module for creating a [`Deployer`].
//!
//! The builder gathers the deploy configuration, the secrets and the target name,
//! and resolves them into a [`Deployer`] without touching the network.

use std::path::PathBuf;

use url::Url;

use crate::{
    DeployConfig, Deployer, Secrets,
    config::SPOCCONF_FILENAME,
    error::ConfigurationError,
    secrets::DEFAULT_SECRETS_FILENAME,
};

/// Builder for creating a [`Deployer`].
///
/// # Example
///
/// ```no_run
/// use spoc_deploy::{DeployerBuilder, PlanStage};
///
/// # async fn example() -> anyhow::Result<()> {
/// let deployer = DeployerBuilder::new("test")
///     .secrets_path(".secrets.json")
///     .artifacts_dir("artifacts")
///     .build()?;
/// deployer.deploy(PlanStage::Token).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DeployerBuilder {
    /// The target name (required).
    target: String,
    /// Path to `Spoc.toml` or its directory. Defaults to the working directory.
    config_path: Option<PathBuf>,
    /// An already loaded configuration; takes precedence over `config_path`.
    config: Option<DeployConfig>,
    /// Path to the secrets file.
    secrets_path: PathBuf,
    /// Overrides the configured artifacts directory.
    artifacts_dir: Option<PathBuf>,
    /// Overrides the target's RPC endpoint.
    rpc_url: Option<Url>,
}

impl DeployerBuilder {
    /// Create a new [`DeployerBuilder`] for the given target name.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            config_path: None,
            config: None,
            secrets_path: PathBuf::from(DEFAULT_SECRETS_FILENAME),
            artifacts_dir: None,
            rpc_url: None,
        }
    }

    /// Set the path of the deploy configuration file.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Use an already loaded configuration.
    pub fn config(mut self, config: DeployConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the path of the secrets file.
    pub fn secrets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_path = path.into();
        self
    }

    /// Override the artifacts directory.
    pub fn artifacts_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(path.into());
        self
    }

    /// Override the RPC endpoint of the target.
    pub fn rpc_url(mut self, url: Url) -> Self {
        self.rpc_url = Some(url);
        self
    }

    /// Load configuration and secrets and resolve the target.
    pub fn build(self) -> Result<Deployer, ConfigurationError> {
        let mut config = match self.config {
            Some(config) => config,
            None => {
                let path = self
                    .config_path
                    .unwrap_or_else(|| PathBuf::from(SPOCCONF_FILENAME));
                DeployConfig::load(&path)?
            }
        };

        if let Some(artifacts_dir) = self.artifacts_dir {
            config.artifacts_dir = artifacts_dir;
        }

        let secrets = Secrets::load(&self.secrets_path)?;
        let mut target = config.networks.resolve(&self.target, &secrets)?;

        if let Some(rpc_url) = self.rpc_url {
            tracing::debug!(network = %target.name, rpc_url = %rpc_url, "Overriding RPC endpoint");
            target.rpc_url = rpc_url;
        }

        tracing::info!(
            network = %target.name,
            rpc_url = %target.rpc_url,
            chain_id = ?target.chain_id,
            gas = ?target.gas,
            artifacts_dir = %config.artifacts_dir.display(),
            "Deployment target resolved"
        );

        Ok(Deployer::new(config, target, secrets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::TargetName;
    use figment::Jail;
    use tempdir::TempDir;

    fn write_secrets(dir: &TempDir) -> PathBuf {
        let path = dir.path().join(DEFAULT_SECRETS_FILENAME);
        std::fs::write(
            &path,
            r#"{
                "testnetAccount": "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                "localhostDeployAccount": "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
            }"#,
        )
        .expect("Failed to write secrets");
        path
    }

    #[test]
    fn test_build_resolves_target() {
        // Secrets::load reads SPOC_* variables.
        Jail::expect_with(|_| {
            let dir = TempDir::new("spoc-builder").expect("Failed to create temp dir");
            let deployer = DeployerBuilder::new("testnet")
                .config_path(dir.path())
                .secrets_path(write_secrets(&dir))
                .artifacts_dir(dir.path().join("artifacts"))
                .build()
                .expect("Deployer should build");

            assert_eq!(deployer.target.name, TargetName::Test);
            assert_eq!(deployer.target.chain_id, Some(97));
            assert_eq!(deployer.config.artifacts_dir, dir.path().join("artifacts"));
            Ok(())
        });
    }

    #[test]
    fn test_rpc_url_override() {
        Jail::expect_with(|_| {
            let dir = TempDir::new("spoc-builder").expect("Failed to create temp dir");
            let url = Url::parse("http://127.0.0.1:9545").unwrap();
            let deployer = DeployerBuilder::new("local")
                .config(DeployConfig::default())
                .secrets_path(write_secrets(&dir))
                .rpc_url(url.clone())
                .build()
                .expect("Deployer should build");

            assert_eq!(deployer.target.rpc_url, url);
            assert_eq!(deployer.target.chain_id, None);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_target_and_missing_credential() {
        Jail::expect_with(|_| {
            let dir = TempDir::new("spoc-builder").expect("Failed to create temp dir");
            let secrets = write_secrets(&dir);

            assert!(matches!(
                DeployerBuilder::new("ropsten")
                    .config(DeployConfig::default())
                    .secrets_path(&secrets)
                    .build(),
                Err(ConfigurationError::UnknownTarget(_))
            ));
            assert!(matches!(
                DeployerBuilder::new("production")
                    .config(DeployConfig::default())
                    .secrets_path(&secrets)
                    .build(),
                Err(ConfigurationError::MissingSecret(_))
            ));
            Ok(())
        });
    }
}
