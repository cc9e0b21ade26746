//! Network profiles and target resolution.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    error::ConfigurationError,
    secrets::{SecretKey, Secrets, SigningCredential},
};

/// BSC testnet chain id.
pub const TEST_CHAIN_ID: u64 = 97;
/// BSC mainnet chain id.
pub const PRODUCTION_CHAIN_ID: u64 = 56;
/// Fixed gas price used on production (20 gwei).
pub const PRODUCTION_GAS_PRICE_WEI: u64 = 20_000_000_000;

/// Default RPC endpoints.
pub const LOCAL_RPC_URL: &str = "http://localhost:8545";
pub const TEST_RPC_URL: &str = "https://bsc-testnet.publicnode.com";
pub const PRODUCTION_RPC_URL: &str = "https://bsc-dataseed.binance.org/";

/// Named deployment environment.
///
/// The Hardhat network names (`localhost`, `testnet`, `mainnet`) are accepted as aliases.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TargetName {
    #[strum(to_string = "local", serialize = "localhost")]
    Local,
    #[strum(to_string = "test", serialize = "testnet")]
    Test,
    #[strum(to_string = "production", serialize = "mainnet")]
    Production,
}

impl TargetName {
    /// Parse a target name, mapping unknown names to a configuration error.
    pub fn parse(name: &str) -> Result<Self, ConfigurationError> {
        Self::from_str(name).map_err(|_| ConfigurationError::UnknownTarget(name.to_string()))
    }
}

/// How the gas price of submitted transactions is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum GasPolicy {
    /// Ask the node (`eth_gasPrice`).
    Network,
    /// Always use the given price.
    Fixed { gas_price_wei: u64 },
}

impl GasPolicy {
    pub fn fixed_price(&self) -> Option<u64> {
        match self {
            GasPolicy::Network => None,
            GasPolicy::Fixed { gas_price_wei } => Some(*gas_price_wei),
        }
    }
}

/// Static description of one network, as written in `Spoc.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// JSON-RPC endpoint.
    pub rpc_url: Url,
    /// Expected chain id. `None` adopts whatever the node reports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Which secret holds the signing key for this network.
    pub credential: SecretKey,
    /// Gas price policy.
    pub gas: GasPolicy,
}

/// The profile table for every [`TargetName`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfiles {
    pub local: NetworkProfile,
    pub test: NetworkProfile,
    pub production: NetworkProfile,
}

impl Default for NetworkProfiles {
    fn default() -> Self {
        Self {
            local: NetworkProfile {
                rpc_url: static_url(LOCAL_RPC_URL),
                chain_id: None,
                gas: GasPolicy::Network,
                credential: SecretKey::LocalhostDeployAccount,
            },
            test: NetworkProfile {
                rpc_url: static_url(TEST_RPC_URL),
                chain_id: Some(TEST_CHAIN_ID),
                gas: GasPolicy::Network,
                credential: SecretKey::TestnetAccount,
            },
            production: NetworkProfile {
                rpc_url: static_url(PRODUCTION_RPC_URL),
                chain_id: Some(PRODUCTION_CHAIN_ID),
                gas: GasPolicy::Fixed {
                    gas_price_wei: PRODUCTION_GAS_PRICE_WEI,
                },
                credential: SecretKey::MainnetAccount,
            },
        }
    }
}

/// Parse one of the compile-time URL constants above.
fn static_url(url: &str) -> Url {
    Url::parse(url).unwrap_or_else(|e| unreachable!("invalid built-in RPC url {url}: {e}"))
}

/// A fully resolved deployment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    pub name: TargetName,
    pub rpc_url: Url,
    /// Configured chain id; `None` for profiles that trust the node.
    pub chain_id: Option<u64>,
    pub gas: GasPolicy,
    /// Secret the credential was read from.
    pub credential: SecretKey,
    pub signing_credential: SigningCredential,
}

impl NetworkProfiles {
    /// The profile for a target.
    pub fn profile(&self, name: TargetName) -> &NetworkProfile {
        match name {
            TargetName::Local => &self.local,
            TargetName::Test => &self.test,
            TargetName::Production => &self.production,
        }
    }

    /// Resolve a target name to its endpoint, chain id, gas policy and credential.
    ///
    /// Pure lookup: no network access. Unknown names and absent credentials are
    /// configuration errors.
    pub fn resolve(
        &self,
        target: &str,
        secrets: &Secrets,
    ) -> Result<DeploymentTarget, ConfigurationError> {
        let name = TargetName::parse(target)?;
        let profile = self.profile(name);
        let signing_credential = secrets.credential(profile.credential)?;

        Ok(DeploymentTarget {
            name,
            rpc_url: profile.rpc_url.clone(),
            chain_id: profile.chain_id,
            gas: profile.gas,
            credential: profile.credential,
            signing_credential,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn all_credentials() -> Secrets {
        Secrets {
            mainnet_account: Some(SigningCredential::new("0x01")),
            testnet_account: Some(SigningCredential::new("0x02")),
            localhost_deploy_account: Some(SigningCredential::new("0x03")),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_chain_ids() {
        let profiles = NetworkProfiles::default();
        let secrets = all_credentials();

        let test = profiles.resolve("test", &secrets).unwrap();
        assert_eq!(test.chain_id, Some(97));
        assert_eq!(test.gas, GasPolicy::Network);

        let production = profiles.resolve("production", &secrets).unwrap();
        assert_eq!(production.chain_id, Some(56));
        assert_eq!(production.gas.fixed_price(), Some(20_000_000_000));

        let local = profiles.resolve("local", &secrets).unwrap();
        assert_eq!(local.chain_id, None);
        assert_eq!(local.rpc_url.as_str(), "http://localhost:8545/");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let profiles = NetworkProfiles::default();
        let secrets = all_credentials();

        for name in TargetName::iter() {
            let first = profiles.resolve(&name.to_string(), &secrets).unwrap();
            let second = profiles.resolve(&name.to_string(), &secrets).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_each_target_uses_its_own_credential() {
        let profiles = NetworkProfiles::default();
        let secrets = all_credentials();

        assert_eq!(profiles.resolve("production", &secrets).unwrap().signing_credential.expose(), "0x01");
        assert_eq!(profiles.resolve("test", &secrets).unwrap().signing_credential.expose(), "0x02");
        assert_eq!(profiles.resolve("local", &secrets).unwrap().signing_credential.expose(), "0x03");
    }

    #[test]
    fn test_hardhat_aliases() {
        assert_eq!(TargetName::parse("localhost").unwrap(), TargetName::Local);
        assert_eq!(TargetName::parse("testnet").unwrap(), TargetName::Test);
        assert_eq!(TargetName::parse("mainnet").unwrap(), TargetName::Production);
        assert_eq!(TargetName::parse("Production").unwrap(), TargetName::Production);
    }

    #[test]
    fn test_unknown_target_is_configuration_error() {
        let profiles = NetworkProfiles::default();
        for name in ["", "ropsten", "prod", "hardhat"] {
            assert!(matches!(
                profiles.resolve(name, &all_credentials()),
                Err(ConfigurationError::UnknownTarget(n)) if n == name
            ));
        }
    }

    #[test]
    fn test_missing_credential_is_reported() {
        let profiles = NetworkProfiles::default();
        let secrets = Secrets {
            testnet_account: Some(SigningCredential::new("0x02")),
            ..Default::default()
        };

        assert!(matches!(
            profiles.resolve("production", &secrets),
            Err(ConfigurationError::MissingSecret(SecretKey::MainnetAccount))
        ));
    }

    #[test]
    fn test_profiles_roundtrip_through_toml() {
        let profiles = NetworkProfiles::default();
        let content = toml::to_string_pretty(&profiles).expect("Profiles should serialize");
        let parsed: NetworkProfiles = toml::from_str(&content).expect("Profiles should parse");
        assert_eq!(parsed, profiles);
    }
}
