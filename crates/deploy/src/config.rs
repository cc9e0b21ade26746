//! Deploy configuration (`Spoc.toml`).

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigurationError, network::NetworkProfiles};

/// The default name for the deploy configuration file.
pub const SPOCCONF_FILENAME: &str = "Spoc.toml";

/// Default Hardhat artifacts directory.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Artifact name of the OpenZeppelin v5 transparent proxy.
pub const DEFAULT_PROXY_ARTIFACT: &str = "TransparentUpgradeableProxy";

/// Receipt polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationConfig {
    /// Interval between `eth_getTransactionReceipt` polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// How long to wait for a receipt before giving up, in seconds.
    pub timeout_secs: u64,
}

impl ConfirmationConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Number of polls that fit in the timeout (at least one).
    pub fn max_polls(&self) -> usize {
        let interval = self.poll_interval_ms.max(1);
        ((self.timeout_secs.saturating_mul(1000)) / interval).max(1) as usize
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2_000,
            timeout_secs: 300,
        }
    }
}

/// Everything a run needs besides secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Hardhat artifacts directory.
    pub artifacts_dir: PathBuf,
    /// Artifact name of the upgradeable proxy contract.
    pub proxy_artifact: String,
    /// Receipt polling.
    pub confirmation: ConfirmationConfig,
    /// Network profile table.
    pub networks: NetworkProfiles,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            proxy_artifact: DEFAULT_PROXY_ARTIFACT.to_string(),
            confirmation: ConfirmationConfig::default(),
            networks: NetworkProfiles::default(),
        }
    }
}

impl DeployConfig {
    /// Load the configuration, layering `path` (if present) over the built-in defaults.
    ///
    /// `path` may point at the file itself or at a directory containing `Spoc.toml`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let config_path = if path.is_dir() {
            path.join(SPOCCONF_FILENAME)
        } else {
            path.to_path_buf()
        };

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&config_path))
            .extract()
            .map_err(|e| ConfigurationError::Config(e.to_string()))?;

        config.validate()?;

        tracing::debug!(path = %config_path.display(), "Deploy configuration loaded");
        Ok(config)
    }

    /// Reject settings that cannot work.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.proxy_artifact.trim().is_empty() {
            return Err(ConfigurationError::Config(
                "proxy_artifact must not be empty".to_string(),
            ));
        }
        if self.confirmation.poll_interval_ms == 0 {
            return Err(ConfigurationError::Config(
                "confirmation.poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.confirmation.timeout_secs == 0 {
            return Err(ConfigurationError::Config(
                "confirmation.timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize deploy config to TOML")?;
        std::fs::write(path, content)
            .context(format!("Failed to write config to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{GasPolicy, TargetName};
    use tempdir::TempDir;

    #[test]
    fn test_defaults_match_static_table() {
        let config = DeployConfig::default();
        assert_eq!(config.networks.profile(TargetName::Test).chain_id, Some(97));
        assert_eq!(config.networks.profile(TargetName::Production).chain_id, Some(56));
        assert_eq!(config.proxy_artifact, "TransparentUpgradeableProxy");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new("spoc-config").expect("Failed to create temp dir");
        let config = DeployConfig::load(&dir.path().join("nope.toml")).expect("Defaults should load");
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_save_and_load_from_directory() {
        let dir = TempDir::new("spoc-config").expect("Failed to create temp dir");
        let mut original = DeployConfig::default();
        original.confirmation.timeout_secs = 42;
        original.networks.local.gas = GasPolicy::Fixed { gas_price_wei: 1 };

        original
            .save_to_file(&dir.path().join(SPOCCONF_FILENAME))
            .expect("Failed to save config");
        let loaded = DeployConfig::load(dir.path()).expect("Failed to load config");

        assert_eq!(loaded, original);
    }

    #[test]
    fn test_partial_file_overrides_defaults() {
        let dir = TempDir::new("spoc-config").expect("Failed to create temp dir");
        let path = dir.path().join(SPOCCONF_FILENAME);
        std::fs::write(
            &path,
            r#"
artifacts_dir = "build/artifacts"

[networks.test]
rpc_url = "https://data-seed-prebsc-1-s1.binance.org:8545/"
chain_id = 97
credential = "testnetAccount"
gas = { mode = "network" }
"#,
        )
        .expect("Failed to write config");

        let config = DeployConfig::load(&path).expect("Failed to load config");
        assert_eq!(config.artifacts_dir, PathBuf::from("build/artifacts"));
        assert_eq!(
            config.networks.test.rpc_url.as_str(),
            "https://data-seed-prebsc-1-s1.binance.org:8545/"
        );
        assert_eq!(config.networks.production, NetworkProfiles::default().production);
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let dir = TempDir::new("spoc-config").expect("Failed to create temp dir");
        let path = dir.path().join(SPOCCONF_FILENAME);
        std::fs::write(&path, "[confirmation]\npoll_interval_ms = 0\ntimeout_secs = 10\n")
            .expect("Failed to write config");

        assert!(matches!(
            DeployConfig::load(&path),
            Err(ConfigurationError::Config(_))
        ));
    }

    #[test]
    fn test_max_polls() {
        let confirmation = ConfirmationConfig {
            poll_interval_ms: 500,
            timeout_secs: 10,
        };
        assert_eq!(confirmation.max_polls(), 20);
    }
}
